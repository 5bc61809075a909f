//! Parser for the per-cell input mini-language.
//!
//! Accepted shapes:
//!
//! - `Name` (numeric state-machine input)
//! - `kind:Name`
//! - `kind:Name(default)`
//! - `list:ListName[innerKind:innerName]`
//!
//! Parsing never fails. Unknown tags are read as part of a numeric input's
//! name and a list without a bracketed element parses to an inert spec.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::table::AssetDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Number,
    Text,
    Boolean,
    Color,
    ViewModelNumber,
    ViewModelBoolean,
    ViewModelImage,
    List,
}

impl InputKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "num" | "number" => Some(Self::Number),
            "txt" | "text" | "str" => Some(Self::Text),
            "bool" => Some(Self::Boolean),
            "col" | "color" => Some(Self::Color),
            "vnum" => Some(Self::ViewModelNumber),
            "vbool" => Some(Self::ViewModelBoolean),
            "img" | "vimg" => Some(Self::ViewModelImage),
            "list" => Some(Self::List),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::Number => "num",
            Self::Text => "txt",
            Self::Boolean => "bool",
            Self::Color => "col",
            Self::ViewModelNumber => "vnum",
            Self::ViewModelBoolean => "vbool",
            Self::ViewModelImage => "img",
            Self::List => "list",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListElement {
    pub kind: InputKind,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputSpec {
    pub kind: InputKind,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element: Option<ListElement>,
}

impl InputSpec {
    /// Serializes back into the cell syntax using canonical tags.
    pub fn to_source(&self) -> String {
        let mut out = format!("{}:{}", self.kind.tag(), self.name);
        if let Some(element) = &self.element {
            out.push('[');
            out.push_str(element.kind.tag());
            out.push(':');
            out.push_str(&element.name);
            if let Some(default) = &element.default {
                out.push_str(&format!("({default})"));
            }
            out.push(']');
        }
        if let Some(default) = &self.default {
            out.push_str(&format!("({default})"));
        }
        out
    }
}

/// A parsed input together with the 1-based table column it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowInput {
    pub column: usize,
    pub spec: InputSpec,
}

pub fn parse_input_spec(raw: &str) -> Option<InputSpec> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (kind, rest) = split_kind(trimmed);
    if kind == InputKind::List {
        return parse_list(rest);
    }

    let (name, default) = split_default(rest);
    if name.is_empty() {
        return None;
    }
    Some(InputSpec {
        kind,
        name,
        default,
        element: None,
    })
}

pub fn parse_row_inputs(asset: &AssetDescriptor) -> Vec<RowInput> {
    asset
        .inputs
        .iter()
        .enumerate()
        .filter_map(|(index, raw)| {
            let spec = parse_input_spec(raw)?;
            Some(RowInput {
                column: index + 1,
                spec,
            })
        })
        .collect()
}

/// `Bars[num:Height(5)](3)`: the bracketed element keeps its own default,
/// a trailing default after the brackets belongs to the list.
fn parse_list(rest: &str) -> Option<InputSpec> {
    let (name, default, element) = match list_pattern().captures(rest) {
        Some(captures) => (
            captures[1].trim().to_owned(),
            captures
                .get(3)
                .map(|value| value.as_str().trim())
                .filter(|value| !value.is_empty())
                .map(str::to_owned),
            parse_element(&captures[2]),
        ),
        None => {
            let (name, default) = split_default(rest);
            (name, default, None)
        }
    };
    if name.is_empty() {
        return None;
    }
    Some(InputSpec {
        kind: InputKind::List,
        name,
        default,
        element,
    })
}

fn parse_element(raw: &str) -> Option<ListElement> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let (kind, rest) = split_kind(trimmed);
    let (name, default) = split_default(rest);
    if name.is_empty() || kind == InputKind::List {
        tracing::debug!("ignoring list element spec '{trimmed}'");
        return None;
    }
    Some(ListElement {
        kind,
        name,
        default,
    })
}

/// Unknown tags keep the whole literal as the name of a numeric input.
fn split_kind(trimmed: &str) -> (InputKind, &str) {
    match trimmed.split_once(':') {
        Some((tag, rest)) => match InputKind::from_tag(tag) {
            Some(kind) => (kind, rest.trim()),
            None => (InputKind::Number, trimmed),
        },
        None => (InputKind::Number, trimmed),
    }
}

fn split_default(rest: &str) -> (String, Option<String>) {
    match default_pattern().captures(rest) {
        Some(captures) => {
            let name = captures[1].trim().to_owned();
            let default = captures[2].trim();
            let default = (!default.is_empty()).then(|| default.to_owned());
            (name, default)
        }
        None => (rest.trim().to_owned(), None),
    }
}

fn default_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(.*?)\s*\(([^()]*)\)\s*$").expect("default regex"))
}

fn list_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(.+?)\[(.*)\]\s*(?:\(([^()]*)\))?\s*$").expect("list regex")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> InputSpec {
        parse_input_spec(raw).expect("spec should parse")
    }

    #[test]
    fn bare_name_is_numeric() {
        let spec = parse("  Speed ");
        assert_eq!(spec.kind, InputKind::Number);
        assert_eq!(spec.name, "Speed");
        assert_eq!(spec.default, None);
    }

    #[test]
    fn empty_cells_are_unset() {
        assert_eq!(parse_input_spec(""), None);
        assert_eq!(parse_input_spec("   "), None);
        assert_eq!(parse_input_spec("num:"), None);
    }

    #[test]
    fn name_and_default_survive_a_round_trip() {
        let cases = [
            ("num", "Level", "12"),
            ("txt", "Title Text", "Hello there"),
            ("vbool", "Is On", "yes"),
            ("col", "Tint", "#ff8800"),
            ("img", "Cover", "cat.png"),
        ];
        for (tag, name, default) in cases {
            let raw = format!("{tag}:{name}({default})");
            let spec = parse(&raw);
            assert_eq!(spec.name, name, "{raw}");
            assert_eq!(spec.default.as_deref(), Some(default), "{raw}");

            let again = parse(&spec.to_source());
            assert_eq!(again.name, name);
            assert_eq!(again.default.as_deref(), Some(default));
        }
    }

    #[test]
    fn tags_map_to_kinds() {
        assert_eq!(parse("text:Label").kind, InputKind::Text);
        assert_eq!(parse("BOOL:Armed").kind, InputKind::Boolean);
        assert_eq!(parse("color:Tint").kind, InputKind::Color);
        assert_eq!(parse("vnum:Count").kind, InputKind::ViewModelNumber);
        assert_eq!(parse("vbool:Open").kind, InputKind::ViewModelBoolean);
        assert_eq!(parse("img:Avatar").kind, InputKind::ViewModelImage);
    }

    #[test]
    fn unknown_tag_becomes_part_of_numeric_name() {
        let spec = parse("weird:Thing(4)");
        assert_eq!(spec.kind, InputKind::Number);
        assert_eq!(spec.name, "weird:Thing");
        assert_eq!(spec.default.as_deref(), Some("4"));
    }

    #[test]
    fn nested_parentheses_are_not_a_default() {
        let spec = parse("num:Wave(a(b))");
        assert_eq!(spec.name, "Wave(a(b))");
        assert_eq!(spec.default, None);
    }

    #[test]
    fn list_with_inner_element() {
        let spec = parse("list:Bars[num:Height]");
        assert_eq!(spec.kind, InputKind::List);
        assert_eq!(spec.name, "Bars");
        let element = spec.element.expect("element");
        assert_eq!(element.kind, InputKind::Number);
        assert_eq!(element.name, "Height");
    }

    #[test]
    fn list_inner_defaults_to_numeric_and_keeps_default() {
        let spec = parse("list:Bars[Height(5)]");
        let element = spec.element.as_ref().expect("element");
        assert_eq!(element.kind, InputKind::Number);
        assert_eq!(element.name, "Height");
        assert_eq!(element.default.as_deref(), Some("5"));
        assert_eq!(spec.to_source(), "list:Bars[num:Height(5)]");
    }

    #[test]
    fn list_default_after_brackets_belongs_to_the_list() {
        let spec = parse("list:Bars[num:Height(5)](3)");
        assert_eq!(spec.name, "Bars");
        assert_eq!(spec.default.as_deref(), Some("3"));
        let element = spec.element.as_ref().expect("element");
        assert_eq!(element.default.as_deref(), Some("5"));
        assert_eq!(spec.to_source(), "list:Bars[num:Height(5)](3)");
    }

    #[test]
    fn list_without_brackets_is_inert() {
        let spec = parse("list:Bars");
        assert_eq!(spec.kind, InputKind::List);
        assert_eq!(spec.name, "Bars");
        assert_eq!(spec.element, None);
    }

    #[test]
    fn row_inputs_keep_their_column() {
        let asset = AssetDescriptor {
            source: String::from("a.riv"),
            width: String::new(),
            height: String::new(),
            name: String::from("a"),
            size: String::new(),
            state_machine: String::from("State Machine 1"),
            artboard: String::new(),
            trigger: String::new(),
            duration: String::new(),
            loop_mode: String::new(),
            background: String::new(),
            inputs: vec![
                String::new(),
                String::from("col:Tint"),
                String::new(),
                String::from("Speed"),
            ],
        };
        let inputs = parse_row_inputs(&asset);
        let columns = inputs.iter().map(|input| input.column).collect::<Vec<_>>();
        assert_eq!(columns, vec![2, 4]);
        assert_eq!(inputs[0].spec.kind, InputKind::Color);
    }
}
