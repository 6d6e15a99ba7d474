//! Boolean text queries for global search.
//!
//! Accepts words, quoted phrases, `AND`, `OR`, `NOT` and parentheses; adjacent terms
//! are joined with an implicit `AND`. Each term is bound as its own parameter and
//! compiled to a `tsquery` expression.

use crate::search::query_builder::bind::push_text;
use crate::search::query_builder::BindValue;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Open,
    Close,
    And,
    Or,
    Not,
    Term { value: String, phrase: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Term { value: String, phrase: bool },
    All(Box<Node>, Box<Node>),
    Any(Box<Node>, Box<Node>),
    Negated(Box<Node>),
}

/// Compiles `raw` into a `tsquery` expression over the text search configuration
/// `config`. Returns `None` for malformed input; callers fall back to
/// `websearch_to_tsquery`, which accepts anything.
pub(super) fn compile_text_query(
    raw: &str,
    config: &str,
    bind_params: &mut Vec<BindValue>,
) -> Option<String> {
    let tokens = tokenize(raw)?;
    let mut cursor = Cursor {
        tokens: &tokens,
        pos: 0,
    };
    let node = cursor.disjunction()?;
    if cursor.pos != tokens.len() {
        return None;
    }
    Some(to_tsquery_sql(&node, config, bind_params))
}

/// `websearch_to_tsquery` over the whole raw input.
pub(super) fn fallback_text_query(
    raw: &str,
    config: &str,
    bind_params: &mut Vec<BindValue>,
) -> String {
    let idx = push_text(bind_params, raw.to_string());
    format!("websearch_to_tsquery('{}', ${})", config, idx)
}

fn to_tsquery_sql(node: &Node, config: &str, bind_params: &mut Vec<BindValue>) -> String {
    match node {
        Node::Term { value, phrase } => {
            let idx = push_text(bind_params, value.clone());
            let function = if *phrase {
                "phraseto_tsquery"
            } else {
                "plainto_tsquery"
            };
            format!("{}('{}', ${})", function, config, idx)
        }
        Node::All(left, right) => {
            let left = to_tsquery_sql(left, config, bind_params);
            let right = to_tsquery_sql(right, config, bind_params);
            format!("({} && {})", left, right)
        }
        Node::Any(left, right) => {
            let left = to_tsquery_sql(left, config, bind_params);
            let right = to_tsquery_sql(right, config, bind_params);
            format!("({} || {})", left, right)
        }
        Node::Negated(inner) => format!("!!({})", to_tsquery_sql(inner, config, bind_params)),
    }
}

/// Splits `raw` into tokens. `None` on an unterminated phrase.
fn tokenize(raw: &str) -> Option<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = raw.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        match c {
            '(' => {
                chars.next();
                tokens.push(Token::Open);
            }
            ')' => {
                chars.next();
                tokens.push(Token::Close);
            }
            '"' => {
                chars.next();
                let mut phrase = String::new();
                let mut closed = false;
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => phrase.extend(chars.next()),
                        '"' => {
                            closed = true;
                            break;
                        }
                        _ => phrase.push(c),
                    }
                }
                if !closed {
                    return None;
                }
                tokens.push(Token::Term {
                    value: phrase,
                    phrase: true,
                });
            }
            _ => {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || matches!(c, '(' | ')' | '"') {
                        break;
                    }
                    word.push(c);
                    chars.next();
                }
                tokens.push(keyword(&word).unwrap_or(Token::Term {
                    value: word,
                    phrase: false,
                }));
            }
        }
    }
    Some(tokens)
}

fn keyword(word: &str) -> Option<Token> {
    if word.eq_ignore_ascii_case("AND") {
        Some(Token::And)
    } else if word.eq_ignore_ascii_case("OR") {
        Some(Token::Or)
    } else if word.eq_ignore_ascii_case("NOT") {
        Some(Token::Not)
    } else {
        None
    }
}

/// Recursive descent over a token slice. Precedence: `NOT` > `AND` (explicit or
/// implicit) > `OR`.
struct Cursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl Cursor<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    fn at_group_end(&self) -> bool {
        matches!(self.peek(), None | Some(Token::Or) | Some(Token::Close))
    }

    fn disjunction(&mut self) -> Option<Node> {
        let mut node = self.conjunction()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let right = self.conjunction()?;
            node = Node::Any(Box::new(node), Box::new(right));
        }
        Some(node)
    }

    fn conjunction(&mut self) -> Option<Node> {
        let mut node = self.negation()?;
        while !self.at_group_end() {
            if self.peek() == Some(&Token::And) {
                self.pos += 1;
                if self.at_group_end() {
                    return None;
                }
            }
            let right = self.negation()?;
            node = Node::All(Box::new(node), Box::new(right));
        }
        Some(node)
    }

    fn negation(&mut self) -> Option<Node> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            return Some(Node::Negated(Box::new(self.negation()?)));
        }
        self.operand()
    }

    fn operand(&mut self) -> Option<Node> {
        match self.advance()?.clone() {
            Token::Open => {
                let inner = self.disjunction()?;
                (self.advance()? == &Token::Close).then_some(inner)
            }
            Token::Term { value, phrase } => Some(Node::Term { value, phrase }),
            Token::Close | Token::And | Token::Or | Token::Not => None,
        }
    }
}
