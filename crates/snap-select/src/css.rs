//! CSS selector parsing and matching
//!
//! Supports type, universal, `#id`, `.class`, attribute conditions
//! (`[a]`, `=`, `~=`, `|=`, `^=`, `$=`, `*=`), the four combinators,
//! selector groups, the structural pseudo-classes (`:first-child`,
//! `:nth-of-type(an+b)` and friends), `:checked`, `:disabled`, `:enabled`,
//! `:empty`, `:root`, `:not()` and `:has()`.

use snap_dom::{DomTree, NodeId};

use crate::SelectorError;

/// Parsed selector group (`a, b > c`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    groups: Vec<Vec<SelectorPart>>,
}

impl Selector {
    /// Parse a selector group
    pub fn parse(selector: &str) -> Result<Self, SelectorError> {
        Ok(Self {
            groups: parse_selector_groups(selector)?,
        })
    }

    /// Check whether `node` matches any selector in the group
    pub fn matches(&self, tree: &DomTree, node: NodeId) -> bool {
        self.groups.iter().any(|chain| matches_chain(tree, node, chain))
    }
}

impl std::str::FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrCondition {
    Exists { key: String },
    Eq { key: String, value: String },
    StartsWith { key: String, value: String },
    EndsWith { key: String, value: String },
    Contains { key: String, value: String },
    Includes { key: String, value: String },
    DashMatch { key: String, value: String },
}

/// Supported pseudo-classes
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PseudoClass {
    Root,
    FirstChild,
    LastChild,
    OnlyChild,
    FirstOfType,
    LastOfType,
    OnlyOfType,
    Empty,
    Checked,
    Disabled,
    Enabled,
    NthChild(Nth),
    NthLastChild(Nth),
    NthOfType(Nth),
    NthLastOfType(Nth),
    Not(Vec<Vec<SelectorPart>>),
    Has(Vec<Vec<SelectorPart>>),
}

/// `an+b` expression; matches 1-based positions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Nth {
    a: i64,
    b: i64,
}

impl Nth {
    fn matches(&self, position: usize) -> bool {
        let n = position as i64;
        if self.a == 0 {
            return n == self.b;
        }
        let diff = n - self.b;
        diff % self.a == 0 && diff / self.a >= 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct CompoundSelector {
    tag: Option<String>,
    universal: bool,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrCondition>,
    pseudo_classes: Vec<PseudoClass>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
    AdjacentSibling,
    GeneralSibling,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SelectorPart {
    step: CompoundSelector,
    // Relation to previous (left) selector part.
    combinator: Option<Combinator>,
}

fn invalid(selector: &str, reason: &str) -> SelectorError {
    SelectorError::InvalidCss {
        selector: selector.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_selector_groups(selector: &str) -> Result<Vec<Vec<SelectorPart>>, SelectorError> {
    split_selector_groups(selector)?
        .iter()
        .map(|group| parse_selector_chain(group))
        .collect()
}

fn parse_selector_chain(selector: &str) -> Result<Vec<SelectorPart>, SelectorError> {
    let selector = selector.trim();
    if selector.is_empty() {
        return Err(invalid(selector, "empty selector"));
    }

    let mut steps = Vec::new();
    let mut pending: Option<Combinator> = None;

    for token in tokenize_selector(selector)? {
        let combinator = match token.as_str() {
            ">" => Some(Combinator::Child),
            "+" => Some(Combinator::AdjacentSibling),
            "~" => Some(Combinator::GeneralSibling),
            _ => None,
        };
        if let Some(c) = combinator {
            if pending.is_some() || steps.is_empty() {
                return Err(invalid(selector, "dangling combinator"));
            }
            pending = Some(c);
            continue;
        }

        let step = parse_compound(&token)?;
        let combinator = if steps.is_empty() {
            None
        } else {
            Some(pending.take().unwrap_or(Combinator::Descendant))
        };
        steps.push(SelectorPart { step, combinator });
    }

    if steps.is_empty() || pending.is_some() {
        return Err(invalid(selector, "dangling combinator"));
    }
    Ok(steps)
}

/// Split on top-level commas
fn split_selector_groups(selector: &str) -> Result<Vec<String>, SelectorError> {
    let mut groups = Vec::new();
    let mut current = String::new();
    let mut scanner = DepthScanner::default();

    for ch in selector.chars() {
        if ch == ',' && scanner.at_top_level() {
            let trimmed = current.trim();
            if trimmed.is_empty() {
                return Err(invalid(selector, "empty group"));
            }
            groups.push(trimmed.to_string());
            current.clear();
            continue;
        }
        scanner.feed(ch).map_err(|reason| invalid(selector, reason))?;
        current.push(ch);
    }
    scanner.finish().map_err(|reason| invalid(selector, reason))?;

    let trimmed = current.trim();
    if trimmed.is_empty() {
        return Err(invalid(selector, "empty group"));
    }
    groups.push(trimmed.to_string());
    Ok(groups)
}

/// Split a chain into compound selectors and combinator tokens
fn tokenize_selector(selector: &str) -> Result<Vec<String>, SelectorError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut scanner = DepthScanner::default();

    for ch in selector.chars() {
        if scanner.at_top_level() {
            if matches!(ch, '>' | '+' | '~') {
                if !current.trim().is_empty() {
                    tokens.push(current.trim().to_string());
                }
                current.clear();
                tokens.push(ch.to_string());
                continue;
            }
            if ch.is_ascii_whitespace() {
                if !current.trim().is_empty() {
                    tokens.push(current.trim().to_string());
                }
                current.clear();
                continue;
            }
        }
        scanner.feed(ch).map_err(|reason| invalid(selector, reason))?;
        current.push(ch);
    }
    scanner.finish().map_err(|reason| invalid(selector, reason))?;

    if !current.trim().is_empty() {
        tokens.push(current.trim().to_string());
    }
    Ok(tokens)
}

/// Tracks bracket, paren and quote nesting while scanning
#[derive(Default)]
struct DepthScanner {
    brackets: usize,
    parens: usize,
    quote: Option<char>,
}

impl DepthScanner {
    fn at_top_level(&self) -> bool {
        self.brackets == 0 && self.parens == 0 && self.quote.is_none()
    }

    fn feed(&mut self, ch: char) -> Result<(), &'static str> {
        if let Some(q) = self.quote {
            if ch == q {
                self.quote = None;
            }
            return Ok(());
        }
        match ch {
            '"' | '\'' if self.brackets > 0 || self.parens > 0 => self.quote = Some(ch),
            '[' => self.brackets += 1,
            ']' => self.brackets = self.brackets.checked_sub(1).ok_or("unbalanced ']'")?,
            '(' => self.parens += 1,
            ')' => self.parens = self.parens.checked_sub(1).ok_or("unbalanced ')'")?,
            _ => {}
        }
        Ok(())
    }

    fn finish(&self) -> Result<(), &'static str> {
        if self.quote.is_some() {
            return Err("unterminated string");
        }
        if self.brackets != 0 {
            return Err("unbalanced '['");
        }
        if self.parens != 0 {
            return Err("unbalanced '('");
        }
        Ok(())
    }
}

fn parse_compound(part: &str) -> Result<CompoundSelector, SelectorError> {
    let bytes = part.as_bytes();
    let mut i = 0usize;
    let mut step = CompoundSelector::default();

    while i < bytes.len() {
        match bytes[i] {
            b'*' => {
                if step.universal || i != 0 {
                    return Err(invalid(part, "misplaced '*'"));
                }
                step.universal = true;
                i += 1;
            }
            b'#' => {
                let (id, next) = parse_ident(part, i + 1).ok_or_else(|| invalid(part, "expected id"))?;
                if step.id.replace(id).is_some() {
                    return Err(invalid(part, "duplicate id"));
                }
                i = next;
            }
            b'.' => {
                let (class, next) = parse_ident(part, i + 1).ok_or_else(|| invalid(part, "expected class name"))?;
                step.classes.push(class);
                i = next;
            }
            b'[' => {
                let (attr, next) = parse_attr_condition(part, i)?;
                step.attrs.push(attr);
                i = next;
            }
            b':' => {
                let (pseudo, next) = parse_pseudo(part, i + 1)?;
                step.pseudo_classes.push(pseudo);
                i = next;
            }
            _ => {
                if i != 0 {
                    return Err(invalid(part, "unexpected character"));
                }
                let (tag, next) = parse_ident(part, i).ok_or_else(|| invalid(part, "unexpected character"))?;
                step.tag = Some(tag.to_ascii_lowercase());
                i = next;
            }
        }
    }
    Ok(step)
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b >= 0x80
}

fn parse_ident(src: &str, start: usize) -> Option<(String, usize)> {
    let bytes = src.as_bytes();
    let mut out = String::new();
    let mut i = start;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 1 < bytes.len() {
            // Escaped character is taken literally
            let ch = src.get(i + 1..)?.chars().next()?;
            out.push(ch);
            i += 1 + ch.len_utf8();
            continue;
        }
        if !is_ident_char(bytes[i]) {
            break;
        }
        let ch = src.get(i..)?.chars().next()?;
        out.push(ch);
        i += ch.len_utf8();
    }
    if out.is_empty() { None } else { Some((out, i)) }
}

fn parse_attr_condition(src: &str, open: usize) -> Result<(AttrCondition, usize), SelectorError> {
    let bytes = src.as_bytes();
    let skip_ws = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        i
    };

    let mut i = skip_ws(open + 1);
    let key_start = i;
    while i < bytes.len() && (is_ident_char(bytes[i]) || bytes[i] == b':') {
        i += 1;
    }
    if key_start == i {
        return Err(invalid(src, "expected attribute name"));
    }
    let key = src[key_start..i].to_ascii_lowercase();

    i = skip_ws(i);
    match bytes.get(i) {
        Some(b']') => return Ok((AttrCondition::Exists { key }, i + 1)),
        None => return Err(invalid(src, "unterminated attribute selector")),
        _ => {}
    }

    let (op, after_op) = match (bytes[i], bytes.get(i + 1)) {
        (b'=', _) => (b'=', i + 1),
        (op @ (b'^' | b'$' | b'*' | b'~' | b'|'), Some(b'=')) => (op, i + 2),
        _ => return Err(invalid(src, "unknown attribute operator")),
    };

    i = skip_ws(after_op);
    let (value, after_value) = parse_attr_value(src, i)?;
    i = skip_ws(after_value);
    // Optional case flag is accepted and ignored
    if matches!(bytes.get(i), Some(b'i' | b'I' | b's' | b'S')) {
        i = skip_ws(i + 1);
    }
    if bytes.get(i) != Some(&b']') {
        return Err(invalid(src, "unterminated attribute selector"));
    }

    let cond = match op {
        b'=' => AttrCondition::Eq { key, value },
        b'^' => AttrCondition::StartsWith { key, value },
        b'$' => AttrCondition::EndsWith { key, value },
        b'*' => AttrCondition::Contains { key, value },
        b'~' => AttrCondition::Includes { key, value },
        _ => AttrCondition::DashMatch { key, value },
    };
    Ok((cond, i + 1))
}

fn parse_attr_value(src: &str, start: usize) -> Result<(String, usize), SelectorError> {
    let bytes = src.as_bytes();
    match bytes.get(start) {
        Some(&q @ (b'"' | b'\'')) => {
            let rest = &src[start + 1..];
            let end = rest
                .find(q as char)
                .ok_or_else(|| invalid(src, "unterminated string"))?;
            Ok((rest[..end].to_string(), start + 1 + end + 1))
        }
        Some(_) => {
            let mut i = start;
            while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b']' {
                i += 1;
            }
            Ok((src[start..i].to_string(), i))
        }
        None => Err(invalid(src, "expected attribute value")),
    }
}

fn parse_pseudo(part: &str, start: usize) -> Result<(PseudoClass, usize), SelectorError> {
    let (name, after_name) = parse_ident(part, start).ok_or_else(|| invalid(part, "expected pseudo-class"))?;
    let name = name.to_ascii_lowercase();

    if part.as_bytes().get(after_name) != Some(&b'(') {
        let pseudo = match name.as_str() {
            "root" => PseudoClass::Root,
            "first-child" => PseudoClass::FirstChild,
            "last-child" => PseudoClass::LastChild,
            "only-child" => PseudoClass::OnlyChild,
            "first-of-type" => PseudoClass::FirstOfType,
            "last-of-type" => PseudoClass::LastOfType,
            "only-of-type" => PseudoClass::OnlyOfType,
            "empty" => PseudoClass::Empty,
            "checked" => PseudoClass::Checked,
            "disabled" => PseudoClass::Disabled,
            "enabled" => PseudoClass::Enabled,
            _ => return Err(invalid(part, "unsupported pseudo-class")),
        };
        return Ok((pseudo, after_name));
    }

    let body_start = after_name + 1;
    let close = find_matching_paren(&part[body_start..]).ok_or_else(|| invalid(part, "unbalanced '('"))?;
    let body = part[body_start..body_start + close].trim();
    let next = body_start + close + 1;

    let nth = || parse_nth(body).ok_or_else(|| invalid(part, "bad nth expression"));
    let pseudo = match name.as_str() {
        "nth-child" => PseudoClass::NthChild(nth()?),
        "nth-last-child" => PseudoClass::NthLastChild(nth()?),
        "nth-of-type" => PseudoClass::NthOfType(nth()?),
        "nth-last-of-type" => PseudoClass::NthLastOfType(nth()?),
        "not" => PseudoClass::Not(parse_selector_groups(body)?),
        "has" => PseudoClass::Has(parse_selector_groups(body)?),
        _ => return Err(invalid(part, "unsupported pseudo-class")),
    };
    Ok((pseudo, next))
}

fn find_matching_paren(body: &str) -> Option<usize> {
    let mut depth = 1usize;
    let mut quote: Option<char> = None;
    for (idx, ch) in body.char_indices() {
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse `odd`, `even`, `5`, `2n+1`, `-n+3`
fn parse_nth(raw: &str) -> Option<Nth> {
    let expr: String = raw
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    match expr.as_str() {
        "" => return None,
        "odd" => return Some(Nth { a: 2, b: 1 }),
        "even" => return Some(Nth { a: 2, b: 0 }),
        _ => {}
    }
    let Some(n_pos) = expr.find('n') else {
        return expr.parse::<i64>().ok().map(|b| Nth { a: 0, b });
    };
    let (a_part, rest) = expr.split_at(n_pos);
    let a = match a_part {
        "" | "+" => 1,
        "-" => -1,
        _ => a_part.parse::<i64>().ok()?,
    };
    let b_part = &rest[1..];
    let b = if b_part.is_empty() {
        0
    } else {
        if !b_part.starts_with(['+', '-']) {
            return None;
        }
        b_part.parse::<i64>().ok()?
    };
    Some(Nth { a, b })
}

fn matches_chain(tree: &DomTree, node: NodeId, chain: &[SelectorPart]) -> bool {
    let Some((last, rest)) = chain.split_last() else {
        return false;
    };
    if !matches_compound(tree, node, &last.step) {
        return false;
    }
    if rest.is_empty() {
        return true;
    }

    match last.combinator.unwrap_or(Combinator::Descendant) {
        Combinator::Child => {
            let parent = tree.parent(node);
            tree.element(parent).is_some() && matches_chain(tree, parent, rest)
        }
        Combinator::Descendant => tree
            .ancestors(node)
            .filter(|a| tree.element(*a).is_some())
            .any(|a| matches_chain(tree, a, rest)),
        Combinator::AdjacentSibling => tree
            .prev_element_sibling(node)
            .is_some_and(|s| matches_chain(tree, s, rest)),
        Combinator::GeneralSibling => {
            let mut cursor = tree.prev_element_sibling(node);
            while let Some(sibling) = cursor {
                if matches_chain(tree, sibling, rest) {
                    return true;
                }
                cursor = tree.prev_element_sibling(sibling);
            }
            false
        }
    }
}

fn matches_compound(tree: &DomTree, node: NodeId, step: &CompoundSelector) -> bool {
    let Some(element) = tree.element(node) else {
        return false;
    };

    if let Some(tag) = &step.tag {
        if !element.is(tag) {
            return false;
        }
    }
    if let Some(id) = &step.id {
        if element.id() != Some(id.as_str()) {
            return false;
        }
    }
    if step.classes.iter().any(|c| !element.has_class(c)) {
        return false;
    }

    for cond in &step.attrs {
        let matched = match cond {
            AttrCondition::Exists { key } => element.has_attr(key),
            AttrCondition::Eq { key, value } => element.get_attr(key) == Some(value.as_str()),
            AttrCondition::StartsWith { key, value } => {
                !value.is_empty() && element.get_attr(key).is_some_and(|v| v.starts_with(value.as_str()))
            }
            AttrCondition::EndsWith { key, value } => {
                !value.is_empty() && element.get_attr(key).is_some_and(|v| v.ends_with(value.as_str()))
            }
            AttrCondition::Contains { key, value } => {
                !value.is_empty() && element.get_attr(key).is_some_and(|v| v.contains(value.as_str()))
            }
            AttrCondition::Includes { key, value } => element
                .get_attr(key)
                .is_some_and(|v| v.split_ascii_whitespace().any(|w| w == value)),
            AttrCondition::DashMatch { key, value } => element.get_attr(key).is_some_and(|v| {
                v == value || v.strip_prefix(value.as_str()).is_some_and(|r| r.starts_with('-'))
            }),
        };
        if !matched {
            return false;
        }
    }

    step.pseudo_classes
        .iter()
        .all(|pseudo| matches_pseudo(tree, node, pseudo))
}

fn matches_pseudo(tree: &DomTree, node: NodeId, pseudo: &PseudoClass) -> bool {
    let Some(element) = tree.element(node) else {
        return false;
    };
    let siblings = || -> Vec<NodeId> { tree.element_children(tree.parent(node)).collect() };
    let same_type = || -> Vec<NodeId> {
        siblings()
            .into_iter()
            .filter(|s| tree.element(*s).is_some_and(|e| e.is(&element.name)))
            .collect()
    };
    let position = |list: &[NodeId]| list.iter().position(|s| *s == node).map(|p| p + 1);
    let position_from_end = |list: &[NodeId]| list.iter().rev().position(|s| *s == node).map(|p| p + 1);

    match pseudo {
        PseudoClass::Root => tree.parent(node) == tree.root(),
        PseudoClass::FirstChild => tree.prev_element_sibling(node).is_none(),
        PseudoClass::LastChild => tree.next_element_sibling(node).is_none(),
        PseudoClass::OnlyChild => {
            tree.prev_element_sibling(node).is_none() && tree.next_element_sibling(node).is_none()
        }
        PseudoClass::FirstOfType => position(&same_type()) == Some(1),
        PseudoClass::LastOfType => position_from_end(&same_type()) == Some(1),
        PseudoClass::OnlyOfType => same_type().len() == 1,
        PseudoClass::Empty => tree.children(node).all(|(_, child)| {
            child.as_text().is_some_and(str::is_empty)
                || matches!(child.data, snap_dom::NodeData::Comment(_))
        }),
        PseudoClass::Checked => {
            (element.is("input") && element.has_attr("checked"))
                || (element.is("option") && element.has_attr("selected"))
        }
        PseudoClass::Disabled => element.has_attr("disabled"),
        PseudoClass::Enabled => {
            !element.has_attr("disabled")
                && ["input", "button", "select", "textarea", "option", "optgroup", "fieldset"]
                    .iter()
                    .any(|t| element.is(t))
        }
        PseudoClass::NthChild(nth) => position(&siblings()).is_some_and(|p| nth.matches(p)),
        PseudoClass::NthLastChild(nth) => position_from_end(&siblings()).is_some_and(|p| nth.matches(p)),
        PseudoClass::NthOfType(nth) => position(&same_type()).is_some_and(|p| nth.matches(p)),
        PseudoClass::NthLastOfType(nth) => {
            position_from_end(&same_type()).is_some_and(|p| nth.matches(p))
        }
        PseudoClass::Not(groups) => !groups.iter().any(|chain| matches_chain(tree, node, chain)),
        PseudoClass::Has(groups) => tree
            .descendant_elements(node)
            .any(|d| groups.iter().any(|chain| matches_chain(tree, d, chain))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nth_expressions() {
        assert_eq!(parse_nth("odd"), Some(Nth { a: 2, b: 1 }));
        assert_eq!(parse_nth("even"), Some(Nth { a: 2, b: 0 }));
        assert_eq!(parse_nth("3"), Some(Nth { a: 0, b: 3 }));
        assert_eq!(parse_nth("-n + 3"), Some(Nth { a: -1, b: 3 }));
        assert_eq!(parse_nth("2n1"), None);

        let first_three = Nth { a: -1, b: 3 };
        assert!(first_three.matches(1));
        assert!(first_three.matches(3));
        assert!(!first_three.matches(4));
        assert!(Nth { a: 2, b: 0 }.matches(4));
        assert!(!Nth { a: 2, b: 0 }.matches(3));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Selector::parse("").is_err());
        assert!(Selector::parse("a >").is_err());
        assert!(Selector::parse("div[").is_err());
        assert!(Selector::parse("a,,b").is_err());
        assert!(Selector::parse("p:hover").is_err());
        assert!(Selector::parse("#").is_err());
    }

    #[test]
    fn test_parse_accepts_common_forms() {
        for sel in [
            "div",
            "*",
            "#main > p.intro",
            "ul li:nth-child(2n+1)",
            "input[type='radio'][name=\"a b\"]",
            "h1 + p ~ span",
            "a:not(.external), area",
            "form:has(input[required])",
        ] {
            assert!(Selector::parse(sel).is_ok(), "{sel}");
        }
    }
}
