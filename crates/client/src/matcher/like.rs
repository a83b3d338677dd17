//! SQL `LIKE` matching.
//!
//! `%` matches any run of characters (including none), `_` exactly one
//! character, everything else itself. Comparison is case-insensitive and
//! covers the whole value. There is no escape character.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    AnyRun,
    AnyOne,
    Literal(char),
}

fn fold(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// A compiled `LIKE` pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikePattern {
    tokens: Vec<Token>,
}

impl LikePattern {
    pub fn new(pattern: &str) -> Self {
        let mut tokens: Vec<Token> = Vec::with_capacity(pattern.len());
        for c in pattern.chars() {
            let token = match c {
                '%' => Token::AnyRun,
                '_' => Token::AnyOne,
                c => Token::Literal(fold(c)),
            };
            if token == Token::AnyRun && tokens.last() == Some(&Token::AnyRun) {
                continue;
            }
            tokens.push(token);
        }
        Self { tokens }
    }

    /// Whether `value` matches the whole pattern.
    ///
    /// Greedy scan that backtracks only to the most recent `%`, so the cost
    /// stays proportional to `value.len() * pattern.len()` in the worst case.
    pub fn matches(&self, value: &str) -> bool {
        let value: Vec<char> = value.chars().map(fold).collect();
        let tokens = &self.tokens;

        let (mut v, mut t) = (0, 0);
        // token index after the last `%`, and the value index it is anchored at
        let mut resume: Option<(usize, usize)> = None;

        while v < value.len() {
            match tokens.get(t) {
                Some(Token::AnyOne) => {
                    v += 1;
                    t += 1;
                    continue;
                }
                Some(Token::Literal(c)) if *c == value[v] => {
                    v += 1;
                    t += 1;
                    continue;
                }
                Some(Token::AnyRun) => {
                    t += 1;
                    resume = Some((t, v));
                    continue;
                }
                _ => {}
            }

            match resume {
                Some((after_run, anchor)) => {
                    t = after_run;
                    v = anchor + 1;
                    resume = Some((after_run, anchor + 1));
                }
                None => return false,
            }
        }

        tokens[t..].iter().all(|token| *token == Token::AnyRun)
    }
}

/// One-shot `LIKE` test of `value` against `pattern`.
pub fn is_like_match(value: &str, pattern: &str) -> bool {
    LikePattern::new(pattern).matches(value)
}
