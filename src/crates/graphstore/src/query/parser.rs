//! Hand-rolled tokenizer and recursive-descent parser

use crate::error::{GraphError, Result};
use crate::model::PropertyValue;
use crate::query::ast::*;

/// Parse a query into its AST
pub fn parse(text: &str) -> Result<Query> {
    let tokens = tokenize(text)?;
    let mut parser = Parser { tokens, pos: 0 };
    let query = parser.parse_query()?;
    parser.expect_end()?;
    Ok(query)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Int(i64),
    Float(f64),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Colon,
    Comma,
    Dot,
    Dash,
    Lt,
    Gt,
    Le,
    Ge,
    Ne,
    Eq,
}

fn tokenize(text: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        match ch {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '[' => {
                tokens.push(Token::LBracket);
                i += 1;
            }
            ']' => {
                tokens.push(Token::RBracket);
                i += 1;
            }
            ':' => {
                tokens.push(Token::Colon);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '.' => {
                tokens.push(Token::Dot);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Dash);
                i += 1;
            }
            '=' => {
                tokens.push(Token::Eq);
                i += 1;
            }
            '<' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Le);
                    i += 2;
                } else if chars.get(i + 1) == Some(&'>') {
                    tokens.push(Token::Ne);
                    i += 2;
                } else {
                    tokens.push(Token::Lt);
                    i += 1;
                }
            }
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Ge);
                    i += 2;
                } else {
                    tokens.push(Token::Gt);
                    i += 1;
                }
            }
            '\'' | '"' => {
                let quote = ch;
                let mut value = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => {
                            return Err(GraphError::Parse(
                                "unterminated string literal".to_string(),
                            ))
                        }
                        Some(&c) if c == quote => {
                            i += 1;
                            break;
                        }
                        Some('\\') => {
                            if let Some(&escaped) = chars.get(i + 1) {
                                value.push(escaped);
                                i += 2;
                            } else {
                                return Err(GraphError::Parse(
                                    "dangling escape in string literal".to_string(),
                                ));
                            }
                        }
                        Some(&c) => {
                            value.push(c);
                            i += 1;
                        }
                    }
                }
                tokens.push(Token::Str(value));
            }
            c if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                if text.contains('.') {
                    let value = text
                        .parse::<f64>()
                        .map_err(|_| GraphError::Parse(format!("bad number: {}", text)))?;
                    tokens.push(Token::Float(value));
                } else {
                    let value = text
                        .parse::<i64>()
                        .map_err(|_| GraphError::Parse(format!("bad number: {}", text)))?;
                    tokens.push(Token::Int(value));
                }
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => {
                return Err(GraphError::Parse(format!(
                    "unexpected character '{}'",
                    other
                )))
            }
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn parse_query(&mut self) -> Result<Query> {
        let mut selects = vec![self.parse_select()?];
        while self.eat_keyword("UNION") {
            selects.push(self.parse_select()?);
        }
        Ok(Query { selects })
    }

    fn parse_select(&mut self) -> Result<Select> {
        let mut patterns = Vec::new();

        self.expect_keyword("MATCH")?;
        loop {
            patterns.push(self.parse_pattern()?);
            if self.eat(&Token::Comma) {
                continue;
            }
            if self.eat_keyword("MATCH") {
                continue;
            }
            break;
        }

        let filter = if self.eat_keyword("WHERE") {
            Some(self.parse_or_expr()?)
        } else {
            None
        };

        self.expect_keyword("RETURN")?;
        let distinct = self.eat_keyword("DISTINCT");

        let mut items = vec![self.parse_return_item()?];
        while self.eat(&Token::Comma) {
            items.push(self.parse_return_item()?);
        }

        let mut order_by = Vec::new();
        if self.eat_keyword("ORDER") {
            self.expect_keyword("BY")?;
            loop {
                let column = self.parse_order_column()?;
                let descending = if self.eat_keyword("DESC") {
                    true
                } else {
                    self.eat_keyword("ASC");
                    false
                };
                order_by.push(OrderKey { column, descending });
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }

        let limit = if self.eat_keyword("LIMIT") {
            match self.next() {
                Some(Token::Int(n)) if *n >= 0 => Some(*n as usize),
                other => {
                    return Err(GraphError::Parse(format!(
                        "LIMIT expects a non-negative integer, got {:?}",
                        other
                    )))
                }
            }
        } else {
            None
        };

        Ok(Select {
            patterns,
            filter,
            distinct,
            items,
            order_by,
            limit,
        })
    }

    fn parse_pattern(&mut self) -> Result<Pattern> {
        let mut nodes = vec![self.parse_node_pattern()?];
        let mut hops = Vec::new();

        loop {
            if self.check(&Token::Dash) {
                // (a)-[:REL]->(b)
                self.eat(&Token::Dash);
                let rel = self.parse_rel_bracket()?;
                self.expect(&Token::Dash)?;
                self.expect(&Token::Gt)?;
                hops.push(Hop {
                    rel,
                    direction: Direction::Out,
                });
                nodes.push(self.parse_node_pattern()?);
            } else if self.check(&Token::Lt) {
                // (a)<-[:REL]-(b)
                self.eat(&Token::Lt);
                self.expect(&Token::Dash)?;
                let rel = self.parse_rel_bracket()?;
                self.expect(&Token::Dash)?;
                hops.push(Hop {
                    rel,
                    direction: Direction::In,
                });
                nodes.push(self.parse_node_pattern()?);
            } else {
                break;
            }
        }

        Ok(Pattern { nodes, hops })
    }

    fn parse_rel_bracket(&mut self) -> Result<String> {
        self.expect(&Token::LBracket)?;
        self.expect(&Token::Colon)?;
        let rel = self.expect_ident("relationship name")?;
        self.expect(&Token::RBracket)?;
        Ok(rel)
    }

    fn parse_node_pattern(&mut self) -> Result<NodePattern> {
        self.expect(&Token::LParen)?;
        let var = if let Some(Token::Ident(_)) = self.peek() {
            Some(self.expect_ident("variable")?)
        } else {
            None
        };
        let label = if self.eat(&Token::Colon) {
            Some(self.expect_ident("label")?)
        } else {
            None
        };
        self.expect(&Token::RParen)?;
        Ok(NodePattern { var, label })
    }

    fn parse_or_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_and_expr()?;
        while self.eat_keyword("OR") {
            let right = self.parse_and_expr()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and_expr(&mut self) -> Result<Expr> {
        let mut left = self.parse_condition()?;
        while self.eat_keyword("AND") {
            let right = self.parse_condition()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_condition(&mut self) -> Result<Expr> {
        if self.eat_keyword("NOT") {
            return Ok(Expr::Not(Box::new(self.parse_condition()?)));
        }
        if self.eat(&Token::LParen) {
            let inner = self.parse_or_expr()?;
            self.expect(&Token::RParen)?;
            return Ok(inner);
        }

        let left = self.parse_operand()?;

        if self.eat_keyword("IS") {
            let negated = self.eat_keyword("NOT");
            self.expect_keyword("NULL")?;
            return Ok(Expr::IsNull {
                operand: left,
                negated,
            });
        }
        if self.eat_keyword("CONTAINS") {
            let right = self.parse_operand()?;
            return Ok(Expr::Contains { left, right });
        }
        if self.eat_keyword("STARTS") {
            self.expect_keyword("WITH")?;
            let right = self.parse_operand()?;
            return Ok(Expr::StartsWith { left, right });
        }
        if self.eat_keyword("IN") {
            let list = self.parse_literal_list()?;
            return Ok(Expr::In { left, list });
        }

        let op = match self.next() {
            Some(Token::Eq) => CmpOp::Eq,
            Some(Token::Ne) => CmpOp::Ne,
            Some(Token::Lt) => CmpOp::Lt,
            Some(Token::Le) => CmpOp::Le,
            Some(Token::Gt) => CmpOp::Gt,
            Some(Token::Ge) => CmpOp::Ge,
            other => {
                return Err(GraphError::Parse(format!(
                    "expected a comparison operator, got {:?}",
                    other
                )))
            }
        };
        let right = self.parse_operand()?;
        Ok(Expr::Cmp { left, op, right })
    }

    fn parse_operand(&mut self) -> Result<Operand> {
        if self.eat(&Token::Dash) {
            return match self.next() {
                Some(Token::Int(n)) => Ok(Operand::Literal(PropertyValue::Int(-n))),
                Some(Token::Float(f)) => Ok(Operand::Literal(PropertyValue::Float(-f))),
                other => Err(GraphError::Parse(format!(
                    "expected a number after '-', got {:?}",
                    other
                ))),
            };
        }

        match self.next().cloned() {
            Some(Token::Str(s)) => Ok(Operand::Literal(PropertyValue::Text(s))),
            Some(Token::Int(n)) => Ok(Operand::Literal(PropertyValue::Int(n))),
            Some(Token::Float(f)) => Ok(Operand::Literal(PropertyValue::Float(f))),
            Some(Token::Ident(word)) => {
                let upper = word.to_uppercase();
                match upper.as_str() {
                    "TRUE" => return Ok(Operand::Literal(PropertyValue::Bool(true))),
                    "FALSE" => return Ok(Operand::Literal(PropertyValue::Bool(false))),
                    "NULL" => return Ok(Operand::Literal(PropertyValue::Null)),
                    _ => {}
                }
                self.expect(&Token::Dot)?;
                let prop = self.expect_ident("property")?;
                Ok(Operand::Property { var: word, prop })
            }
            other => Err(GraphError::Parse(format!(
                "expected an operand, got {:?}",
                other
            ))),
        }
    }

    fn parse_literal_list(&mut self) -> Result<Vec<PropertyValue>> {
        self.expect(&Token::LBracket)?;
        let mut items = Vec::new();
        if !self.check(&Token::RBracket) {
            loop {
                match self.parse_operand()? {
                    Operand::Literal(value) => items.push(value),
                    Operand::Property { var, prop } => {
                        return Err(GraphError::Parse(format!(
                            "IN lists take literals only, got {}.{}",
                            var, prop
                        )))
                    }
                }
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }
        self.expect(&Token::RBracket)?;
        Ok(items)
    }

    fn parse_return_item(&mut self) -> Result<ReturnItem> {
        let operand = self.parse_operand()?;
        let alias = if self.eat_keyword("AS") {
            Some(self.expect_ident("alias")?)
        } else {
            None
        };
        Ok(ReturnItem { operand, alias })
    }

    fn parse_order_column(&mut self) -> Result<String> {
        let first = self.expect_ident("order column")?;
        if self.eat(&Token::Dot) {
            let prop = self.expect_ident("property")?;
            Ok(format!("{}.{}", first, prop))
        } else {
            Ok(first)
        }
    }

    // Token helpers

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn check(&self, expected: &Token) -> bool {
        self.peek() == Some(expected)
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.check(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<()> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(GraphError::Parse(format!(
                "expected {:?}, got {:?}",
                expected,
                self.peek()
            )))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<String> {
        match self.next() {
            Some(Token::Ident(name)) => Ok(name.clone()),
            other => Err(GraphError::Parse(format!(
                "expected {}, got {:?}",
                what, other
            ))),
        }
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Ident(word)) if word.eq_ignore_ascii_case(keyword))
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.is_keyword(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(GraphError::Parse(format!(
                "expected {}, got {:?}",
                keyword,
                self.peek()
            )))
        }
    }

    fn expect_end(&self) -> Result<()> {
        if self.pos == self.tokens.len() {
            Ok(())
        } else {
            Err(GraphError::Parse(format!(
                "trailing tokens after query: {:?}",
                self.peek()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_match_return() {
        let query = parse("MATCH (p:Person) RETURN p.email, p.status").unwrap();
        assert_eq!(query.selects.len(), 1);
        let select = &query.selects[0];
        assert_eq!(select.patterns.len(), 1);
        assert_eq!(select.items.len(), 2);
        assert_eq!(select.items[0].column_name(), "p.email");
    }

    #[test]
    fn parses_hops_both_directions() {
        let query = parse(
            "MATCH (p:Person)-[:MEMBER_OF]->(t:Team)<-[:MEMBER_OF]-(q:Person) \
             RETURN p.email, q.email",
        )
        .unwrap();
        let pattern = &query.selects[0].patterns[0];
        assert_eq!(pattern.nodes.len(), 3);
        assert_eq!(pattern.hops[0].direction, Direction::Out);
        assert_eq!(pattern.hops[1].direction, Direction::In);
    }

    #[test]
    fn parses_where_clause_precedence() {
        let query = parse(
            "MATCH (p:Person) WHERE p.status = 'active' OR p.status = 'staged' \
             AND p.department CONTAINS 'Eng' RETURN p.email",
        )
        .unwrap();
        // AND binds tighter: Or(a, And(b, c))
        match query.selects[0].filter.as_ref().unwrap() {
            Expr::Or(_, right) => assert!(matches!(**right, Expr::And(_, _))),
            other => panic!("expected OR at the root, got {:?}", other),
        }
    }

    #[test]
    fn parses_union_with_aliases() {
        let query = parse(
            "MATCH (p:Person)-[:HAS_ACCESS]->(a:Application) RETURN a.label AS app \
             UNION \
             MATCH (p:Person)-[:MEMBER_OF]->(t:Team)-[:GROUP_HAS_ACCESS]->(a:Application) \
             RETURN a.label AS app",
        )
        .unwrap();
        assert_eq!(query.selects.len(), 2);
        assert_eq!(query.selects[0].items[0].column_name(), "app");
    }

    #[test]
    fn parses_order_limit_distinct() {
        let query = parse(
            "MATCH (p:Person) RETURN DISTINCT p.department AS dept \
             ORDER BY dept DESC LIMIT 10",
        )
        .unwrap();
        let select = &query.selects[0];
        assert!(select.distinct);
        assert_eq!(select.order_by[0].column, "dept");
        assert!(select.order_by[0].descending);
        assert_eq!(select.limit, Some(10));
    }

    #[test]
    fn parses_in_and_null_checks() {
        let query = parse(
            "MATCH (p:Person) WHERE p.status IN ['active', 'staged'] \
             AND p.last_login IS NOT NULL RETURN p.login",
        )
        .unwrap();
        assert!(query.selects[0].filter.is_some());
    }

    #[test]
    fn rejects_malformed_queries() {
        assert!(parse("MATCH (p:Person RETURN p.email").is_err());
        assert!(parse("MATCH (p:Person) RETURN").is_err());
        assert!(parse("RETURN p.email").is_err());
        assert!(parse("MATCH (p:Person) WHERE RETURN p.email").is_err());
        assert!(parse("MATCH (p:Person) RETURN p.email LIMIT many").is_err());
    }

    #[test]
    fn rejects_trailing_tokens() {
        assert!(parse("MATCH (p:Person) RETURN p.email extra").is_err());
    }
}
