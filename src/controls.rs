//! Turns an asset's trigger and parsed inputs into a structured control set:
//! the UI controls to render and the bindings that connect them to the loaded
//! animation. Markup and script are produced from this by `markup`.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::config::GalleryConfig;
use crate::input_spec::{InputKind, InputSpec, ListElement, RowInput};
use crate::table::AssetDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlKind {
    TriggerButton,
    NumberField,
    TextField,
    Checkbox,
    ColorPicker,
    ImageFileField,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Control {
    pub kind: ControlKind,
    pub label: String,
    pub default: String,
    pub element_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BindingTarget {
    StateMachineTrigger { input: String },
    StateMachineNumber { input: String },
    StateMachineBoolean { input: String },
    ViewModelString { property: String },
    ViewModelNumber { property: String },
    ViewModelBoolean { property: String },
    /// Opaque ARGB with alpha forced to full.
    ViewModelColor { property: String },
    ViewModelImage { property: String },
    ViewModelList { property: String, element: ListElement },
}

impl BindingTarget {
    pub fn is_view_model(&self) -> bool {
        !matches!(
            self,
            Self::StateMachineTrigger { .. }
                | Self::StateMachineNumber { .. }
                | Self::StateMachineBoolean { .. }
        )
    }
}

/// When a binding pushes its control's value into the animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyOn {
    Click,
    Change,
    LoadAndChange,
    /// Exposed to page scripts only; nothing is wired to a control.
    Programmatic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Binding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_element: Option<String>,
    pub target: BindingTarget,
    pub apply: ApplyOn,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ControlSet {
    pub controls: Vec<Control>,
    pub bindings: Vec<Binding>,
}

impl ControlSet {
    pub fn uses_view_model(&self) -> bool {
        self.bindings.iter().any(|binding| binding.target.is_view_model())
    }

    pub fn uses_state_machine_inputs(&self) -> bool {
        self.bindings
            .iter()
            .any(|binding| !binding.target.is_view_model())
    }
}

/// What one parsed input contributes to a control set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputPlan {
    Field { control: Control, binding: Binding },
    Programmatic(Binding),
    Ignored,
}

pub fn build_control_set(
    asset: &AssetDescriptor,
    inputs: &[RowInput],
    slot: &str,
    config: &GalleryConfig,
) -> ControlSet {
    let mut set = ControlSet::default();

    if !asset.trigger.is_empty() {
        let element_id = format!("{slot}_trigger");
        set.controls.push(Control {
            kind: ControlKind::TriggerButton,
            label: asset.trigger.clone(),
            default: String::new(),
            element_id: element_id.clone(),
        });
        set.bindings.push(Binding {
            source_element: Some(element_id),
            target: BindingTarget::StateMachineTrigger {
                input: asset.trigger.clone(),
            },
            apply: ApplyOn::Click,
        });
    }

    for input in inputs {
        match plan_input(asset, input, slot, config) {
            InputPlan::Field { control, binding } => {
                set.controls.push(control);
                set.bindings.push(binding);
            }
            InputPlan::Programmatic(binding) => set.bindings.push(binding),
            InputPlan::Ignored => {
                tracing::debug!(
                    "input{} '{}' of {} renders no control",
                    input.column,
                    input.spec.name,
                    asset.source
                );
            }
        }
    }

    set
}

pub fn plan_input(
    asset: &AssetDescriptor,
    input: &RowInput,
    slot: &str,
    config: &GalleryConfig,
) -> InputPlan {
    let spec = &input.spec;
    let element_id = format!("{slot}_in{}", input.column);
    let name = spec.name.clone();

    let (control_kind, default, target, apply) = match spec.kind {
        InputKind::Number => (
            ControlKind::NumberField,
            number_default(spec, config),
            BindingTarget::StateMachineNumber { input: name },
            ApplyOn::LoadAndChange,
        ),
        InputKind::Text => (
            ControlKind::TextField,
            spec.default.clone().unwrap_or_default(),
            BindingTarget::ViewModelString { property: name },
            ApplyOn::LoadAndChange,
        ),
        InputKind::Boolean => (
            ControlKind::Checkbox,
            bool_default(spec).to_string(),
            BindingTarget::StateMachineBoolean { input: name },
            ApplyOn::Change,
        ),
        InputKind::Color => (
            ControlKind::ColorPicker,
            spec.default
                .as_deref()
                .and_then(normalize_hex)
                .unwrap_or_else(|| derived_color(&asset.source, &spec.name)),
            BindingTarget::ViewModelColor { property: name },
            ApplyOn::LoadAndChange,
        ),
        InputKind::ViewModelNumber => (
            ControlKind::NumberField,
            number_default(spec, config),
            BindingTarget::ViewModelNumber { property: name },
            ApplyOn::LoadAndChange,
        ),
        InputKind::ViewModelBoolean => (
            ControlKind::Checkbox,
            bool_default(spec).to_string(),
            BindingTarget::ViewModelBoolean { property: name },
            ApplyOn::LoadAndChange,
        ),
        InputKind::ViewModelImage => {
            let default = spec.default.clone().unwrap_or_default();
            let apply = if default.is_empty() {
                ApplyOn::Change
            } else {
                ApplyOn::LoadAndChange
            };
            (
                ControlKind::ImageFileField,
                default,
                BindingTarget::ViewModelImage { property: name },
                apply,
            )
        }
        InputKind::List => {
            return match &spec.element {
                Some(element) if is_list_element_kind(element.kind) => {
                    InputPlan::Programmatic(Binding {
                        source_element: None,
                        target: BindingTarget::ViewModelList {
                            property: name,
                            element: element.clone(),
                        },
                        apply: ApplyOn::Programmatic,
                    })
                }
                _ => InputPlan::Ignored,
            };
        }
    };

    InputPlan::Field {
        control: Control {
            kind: control_kind,
            label: spec.name.clone(),
            default,
            element_id: element_id.clone(),
        },
        binding: Binding {
            source_element: Some(element_id),
            target,
            apply,
        },
    }
}

/// Accepts `true/yes/on/1` and `false/no/off/0`, case-insensitively.
pub fn parse_bool_literal(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// `#rrggbb`, `rrggbb` or `#rgb` to lowercase `#rrggbb`.
pub fn normalize_hex(raw: &str) -> Option<String> {
    let digits = raw.trim().trim_start_matches('#');
    if !digits.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return None;
    }
    let expanded = match digits.len() {
        6 => digits.to_ascii_lowercase(),
        3 => digits
            .chars()
            .flat_map(|ch| [ch, ch])
            .collect::<String>()
            .to_ascii_lowercase(),
        _ => return None,
    };
    Some(format!("#{expanded}"))
}

/// `0xFF000000 | rgb` for a 24-bit hex colour.
pub fn encode_argb(hex: &str) -> Option<u32> {
    let normalized = normalize_hex(hex)?;
    let rgb = u32::from_str_radix(&normalized[1..], 16).ok()?;
    Some(0xFF00_0000 | rgb)
}

/// Stable stand-in for a random colour: the same asset and input always get
/// the same swatch, so regenerated pages do not churn.
pub fn derived_color(source: &str, input_name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update([0u8]);
    hasher.update(input_name.as_bytes());
    let digest = hasher.finalize();
    format!("#{:02x}{:02x}{:02x}", digest[0], digest[1], digest[2])
}

fn is_list_element_kind(kind: InputKind) -> bool {
    matches!(
        kind,
        InputKind::Number
            | InputKind::ViewModelNumber
            | InputKind::Text
            | InputKind::Boolean
            | InputKind::ViewModelBoolean
            | InputKind::Color
    )
}

fn number_default(spec: &InputSpec, config: &GalleryConfig) -> String {
    match spec.default.as_deref() {
        Some(value) if value.parse::<f64>().is_ok() => value.to_owned(),
        Some(value) => {
            tracing::debug!("ignoring non-numeric default '{value}' for '{}'", spec.name);
            config.default_number.clone()
        }
        None => config.default_number.clone(),
    }
}

fn bool_default(spec: &InputSpec) -> bool {
    spec.default
        .as_deref()
        .and_then(parse_bool_literal)
        .unwrap_or(false)
}
