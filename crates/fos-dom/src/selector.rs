//! CSS Selectors
//!
//! Parsing and matching for the selector subset used by `querySelector`,
//! `closest` and `matches`: type, universal, `#id`, `.class`, attribute
//! selectors, the four combinators and comma-separated lists.

use crate::{DomTree, NodeId};

/// Selector parse error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,

    #[error("unexpected character '{ch}' at offset {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("unexpected end of selector")]
    UnexpectedEnd,

    #[error("unsupported selector syntax: {0}")]
    Unsupported(String),
}

/// A parsed selector list (`a, .nav > a`)
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    source: String,
    alternatives: Vec<ComplexSelector>,
}

/// One alternative of a list, stored right-to-left for matching
#[derive(Debug, Clone, PartialEq)]
struct ComplexSelector {
    subject: CompoundSelector,
    /// Compounds to the left of the subject, nearest first
    context: Vec<(Combinator, CompoundSelector)>,
}

/// Relationship between two compounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// `a b`
    Descendant,
    /// `a > b`
    Child,
    /// `a + b`
    NextSibling,
    /// `a ~ b`
    SubsequentSibling,
}

/// Sequence of simple selectors with no combinator (`a.nav[href]`)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompoundSelector {
    pub components: Vec<SelectorComponent>,
}

/// A component of a compound selector
#[derive(Debug, Clone, PartialEq)]
pub enum SelectorComponent {
    /// Universal selector *
    Universal,
    /// Type selector (tag name)
    Type(String),
    /// ID selector #id
    Id(String),
    /// Class selector .class
    Class(String),
    /// Attribute selector [attr], [attr=value], etc.
    Attribute(AttributeSelector),
}

/// Attribute selector
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSelector {
    pub name: String,
    pub matcher: Option<AttributeMatcher>,
    pub case_insensitive: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeMatcher {
    /// [attr=value] - exact match
    Exact(String),
    /// [attr~=value] - whitespace-separated list contains
    Contains(String),
    /// [attr|=value] - exact or prefix with hyphen
    DashMatch(String),
    /// [attr^=value] - starts with
    Prefix(String),
    /// [attr$=value] - ends with
    Suffix(String),
    /// [attr*=value] - contains substring
    Substring(String),
}

impl AttributeSelector {
    /// Check if an attribute value matches
    pub fn matches(&self, value: Option<&str>) -> bool {
        let (Some(matcher), Some(val)) = (&self.matcher, value) else {
            return self.matcher.is_none() && value.is_some();
        };

        let fold = |s: &str| {
            if self.case_insensitive {
                s.to_ascii_lowercase()
            } else {
                s.to_string()
            }
        };
        let val = fold(val);

        match matcher {
            AttributeMatcher::Exact(expected) => val == fold(expected),
            AttributeMatcher::Contains(expected) => {
                let expected = fold(expected);
                val.split_ascii_whitespace().any(|w| w == expected)
            }
            AttributeMatcher::DashMatch(expected) => {
                let expected = fold(expected);
                val == expected || val.starts_with(&format!("{expected}-"))
            }
            // Empty operands never match for the substring family
            AttributeMatcher::Prefix(expected) => !expected.is_empty() && val.starts_with(&fold(expected)),
            AttributeMatcher::Suffix(expected) => !expected.is_empty() && val.ends_with(&fold(expected)),
            AttributeMatcher::Substring(expected) => !expected.is_empty() && val.contains(&fold(expected)),
        }
    }
}

impl CompoundSelector {
    /// Match against a single element, ignoring combinators
    pub fn matches(&self, tree: &DomTree, id: NodeId) -> bool {
        let Some(elem) = tree.element(id) else {
            return false;
        };
        self.components.iter().all(|component| match component {
            SelectorComponent::Universal => true,
            SelectorComponent::Type(tag) => elem.name.eq_ignore_ascii_case(tag),
            SelectorComponent::Id(want) => elem.id() == Some(want.as_str()),
            SelectorComponent::Class(class) => elem.has_class(class),
            SelectorComponent::Attribute(attr) => attr.matches(elem.get_attr(&attr.name)),
        })
    }
}

impl Selector {
    /// Parse a selector list
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let mut parser = Parser::new(input);
        let mut alternatives = Vec::new();
        loop {
            alternatives.push(parser.complex()?);
            parser.skip_whitespace();
            match parser.peek() {
                None => break,
                Some(',') => {
                    parser.bump();
                }
                Some(ch) => return Err(SelectorError::UnexpectedChar { ch, pos: parser.pos() }),
            }
        }
        Ok(Self {
            source: input.trim().to_string(),
            alternatives,
        })
    }

    /// Selector text as written
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether the element matches any alternative
    pub fn matches(&self, tree: &DomTree, id: NodeId) -> bool {
        self.alternatives.iter().any(|complex| {
            complex.subject.matches(tree, id) && matches_context(tree, id, &complex.context)
        })
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

impl std::str::FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn matches_context(tree: &DomTree, id: NodeId, context: &[(Combinator, CompoundSelector)]) -> bool {
    let Some(((combinator, compound), rest)) = context.split_first() else {
        return true;
    };

    let element_parent = |n: NodeId| tree.parent(n).filter(|&p| tree.element(p).is_some());

    match combinator {
        Combinator::Child => element_parent(id)
            .is_some_and(|p| compound.matches(tree, p) && matches_context(tree, p, rest)),
        Combinator::Descendant => {
            let mut cur = element_parent(id);
            while let Some(p) = cur {
                if compound.matches(tree, p) && matches_context(tree, p, rest) {
                    return true;
                }
                cur = element_parent(p);
            }
            false
        }
        Combinator::NextSibling => tree
            .prev_element_sibling(id)
            .is_some_and(|s| compound.matches(tree, s) && matches_context(tree, s, rest)),
        Combinator::SubsequentSibling => {
            let mut cur = tree.prev_element_sibling(id);
            while let Some(s) = cur {
                if compound.matches(tree, s) && matches_context(tree, s, rest) {
                    return true;
                }
                cur = tree.prev_element_sibling(s);
            }
            false
        }
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    fn pos(&self) -> usize {
        self.pos
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn expect(&mut self, want: char) -> Result<(), SelectorError> {
        match self.bump() {
            Some(ch) if ch == want => Ok(()),
            Some(ch) => Err(SelectorError::UnexpectedChar { ch, pos: self.pos - 1 }),
            None => Err(SelectorError::UnexpectedEnd),
        }
    }

    fn complex(&mut self) -> Result<ComplexSelector, SelectorError> {
        self.skip_whitespace();
        let mut compounds: Vec<(Option<Combinator>, CompoundSelector)> = Vec::new();

        loop {
            let had_space = self.skip_whitespace();
            let combinator = match self.peek() {
                None | Some(',') => break,
                Some('>') => Some(Combinator::Child),
                Some('+') => Some(Combinator::NextSibling),
                Some('~') => Some(Combinator::SubsequentSibling),
                _ if had_space && !compounds.is_empty() => Some(Combinator::Descendant),
                _ => None,
            };

            if let Some(c) = combinator {
                if compounds.is_empty() {
                    return Err(SelectorError::UnexpectedChar {
                        ch: self.peek().unwrap_or(' '),
                        pos: self.pos,
                    });
                }
                if c != Combinator::Descendant {
                    self.bump();
                    self.skip_whitespace();
                }
            } else if !compounds.is_empty() {
                let ch = self.peek().unwrap_or(' ');
                return Err(SelectorError::UnexpectedChar { ch, pos: self.pos });
            }

            compounds.push((combinator, self.compound()?));
        }

        let Some((mut link, subject)) = compounds.pop() else {
            return Err(SelectorError::Empty);
        };

        // Each compound carries the combinator to its left; walk leftwards
        // so the nearest context ends up first.
        let mut context = Vec::with_capacity(compounds.len());
        while let Some((before, compound)) = compounds.pop() {
            context.push((link.unwrap_or(Combinator::Descendant), compound));
            link = before;
        }
        Ok(ComplexSelector { subject, context })
    }

    fn compound(&mut self) -> Result<CompoundSelector, SelectorError> {
        let mut compound = CompoundSelector::default();

        match self.peek() {
            Some('*') => {
                self.bump();
                compound.components.push(SelectorComponent::Universal);
            }
            Some(ch) if is_ident_start(ch) => {
                compound.components.push(SelectorComponent::Type(self.ident()?.to_ascii_lowercase()));
            }
            _ => {}
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.bump();
                    compound.components.push(SelectorComponent::Id(self.ident()?));
                }
                Some('.') => {
                    self.bump();
                    compound.components.push(SelectorComponent::Class(self.ident()?));
                }
                Some('[') => {
                    self.bump();
                    compound.components.push(SelectorComponent::Attribute(self.attribute()?));
                }
                Some(':') => {
                    let rest: String = self.chars[self.pos..].iter().collect();
                    return Err(SelectorError::Unsupported(rest));
                }
                _ => break,
            }
        }

        if compound.components.is_empty() {
            return match self.peek() {
                Some(ch) => Err(SelectorError::UnexpectedChar { ch, pos: self.pos }),
                None => Err(SelectorError::UnexpectedEnd),
            };
        }
        Ok(compound)
    }

    fn ident(&mut self) -> Result<String, SelectorError> {
        let mut out = String::new();
        while let Some(ch) = self.peek() {
            if ch == '\\' {
                self.bump();
                out.push(self.bump().ok_or(SelectorError::UnexpectedEnd)?);
            } else if is_ident_char(ch) {
                out.push(ch);
                self.bump();
            } else {
                break;
            }
        }
        if out.is_empty() {
            return match self.peek() {
                Some(ch) => Err(SelectorError::UnexpectedChar { ch, pos: self.pos }),
                None => Err(SelectorError::UnexpectedEnd),
            };
        }
        Ok(out)
    }

    fn attribute(&mut self) -> Result<AttributeSelector, SelectorError> {
        self.skip_whitespace();
        let name = self.ident()?.to_ascii_lowercase();
        self.skip_whitespace();

        let op = match self.peek() {
            Some(']') => {
                self.bump();
                return Ok(AttributeSelector { name, matcher: None, case_insensitive: false });
            }
            Some('=') => {
                self.bump();
                '='
            }
            Some(op @ ('~' | '|' | '^' | '$' | '*')) => {
                self.bump();
                self.expect('=')?;
                op
            }
            Some(ch) => return Err(SelectorError::UnexpectedChar { ch, pos: self.pos }),
            None => return Err(SelectorError::UnexpectedEnd),
        };

        self.skip_whitespace();
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.bump();
                let mut value = String::new();
                loop {
                    match self.bump() {
                        Some(ch) if ch == quote => break,
                        Some('\\') => value.push(self.bump().ok_or(SelectorError::UnexpectedEnd)?),
                        Some(ch) => value.push(ch),
                        None => return Err(SelectorError::UnexpectedEnd),
                    }
                }
                value
            }
            _ => self.ident()?,
        };

        self.skip_whitespace();
        let mut case_insensitive = false;
        if let Some(flag @ ('i' | 'I' | 's' | 'S')) = self.peek() {
            self.bump();
            case_insensitive = flag.eq_ignore_ascii_case(&'i');
            self.skip_whitespace();
        }
        self.expect(']')?;

        let matcher = match op {
            '=' => AttributeMatcher::Exact(value),
            '~' => AttributeMatcher::Contains(value),
            '|' => AttributeMatcher::DashMatch(value),
            '^' => AttributeMatcher::Prefix(value),
            '$' => AttributeMatcher::Suffix(value),
            _ => AttributeMatcher::Substring(value),
        };
        Ok(AttributeSelector { name, matcher: Some(matcher), case_insensitive })
    }
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || ch == '-' || !ch.is_ascii()
}

fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' || !ch.is_ascii()
}

impl DomTree {
    /// `element.matches(selector)`
    pub fn matches_selector(&self, id: NodeId, selector: &Selector) -> bool {
        selector.matches(self, id)
    }

    /// Nearest inclusive ancestor matching the selector
    pub fn closest_matching(&self, id: NodeId, selector: &Selector) -> Option<NodeId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|&n| selector.matches(self, n))
    }

    /// First descendant of `scope` (in document order) matching the selector
    pub fn select_first(&self, scope: NodeId, selector: &Selector) -> Option<NodeId> {
        self.descendants(scope).into_iter().find(|&n| selector.matches(self, n))
    }

    /// All descendants of `scope` matching the selector
    pub fn select_all(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|&n| selector.matches(self, n))
            .collect()
    }
}
