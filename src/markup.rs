//! Renders a [`ControlSet`] to HTML controls and to the script that binds
//! them to a `rive.Rive` instance.

use serde_json::Value;

use crate::controls::{
    normalize_hex, parse_bool_literal, ApplyOn, Binding, BindingTarget, Control, ControlKind,
    ControlSet,
};
use crate::input_spec::{InputKind, ListElement};

/// One animation on a page. `slot` doubles as the JS variable name and the
/// prefix of every element id belonging to the instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub slot: String,
    pub src: String,
    pub artboard: String,
    pub state_machine: String,
}

impl Instance {
    pub fn canvas_id(&self) -> String {
        format!("{}_canvas", self.slot)
    }
}

/// Page-relative locations the runtime script resolves against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptContext {
    /// Prefix for user-entered image file names, e.g. `images/` or `../images/`.
    pub images_base: String,
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// A JS string literal safe to embed inside a `<script>` element.
pub fn js_string(raw: &str) -> String {
    Value::String(raw.to_owned())
        .to_string()
        .replace("</", "<\\/")
}

pub fn render_viewport(instance: &Instance, width: &str, height: &str) -> String {
    format!(
        "<canvas id=\"{}\" width=\"{}\" height=\"{}\"></canvas>",
        escape_html(&instance.canvas_id()),
        escape_html(width),
        escape_html(height)
    )
}

pub fn render_controls(controls: &[Control]) -> String {
    if controls.is_empty() {
        return String::new();
    }
    let mut out = String::from("<div class=\"controls\">\n");
    for control in controls {
        out.push_str("  ");
        out.push_str(&render_control(control));
        out.push('\n');
    }
    out.push_str("</div>\n");
    out
}

fn render_control(control: &Control) -> String {
    let id = escape_html(&control.element_id);
    let label = escape_html(&control.label);
    let value = escape_html(&control.default);
    match control.kind {
        ControlKind::TriggerButton => {
            format!("<button id=\"{id}\" type=\"button\">{label}</button>")
        }
        ControlKind::NumberField => format!(
            "<label>{label} <input id=\"{id}\" type=\"number\" value=\"{value}\"></label>"
        ),
        ControlKind::TextField => format!(
            "<label>{label} <input id=\"{id}\" type=\"text\" value=\"{value}\"></label>"
        ),
        ControlKind::Checkbox => {
            let checked = if control.default == "true" { " checked" } else { "" };
            format!("<label><input id=\"{id}\" type=\"checkbox\"{checked}> {label}</label>")
        }
        ControlKind::ColorPicker => format!(
            "<label>{label} <input id=\"{id}\" type=\"color\" value=\"{value}\"></label>"
        ),
        ControlKind::ImageFileField => format!(
            "<label>{label} <input id=\"{id}\" type=\"text\" value=\"{value}\" placeholder=\"image file\"></label>"
        ),
    }
}

/// Helpers shared by every instance script on a page.
pub fn render_script_prelude() -> String {
    String::from(
        r##"const toArgb = (hex) => (0xFF000000 | parseInt(String(hex).replace("#", ""), 16)) >>> 0;
window.riveLists = window.riveLists || {};
document.querySelectorAll("canvas").forEach((canvas) => {
  canvas.style.width = canvas.width + "px";
  canvas.style.height = canvas.height + "px";
});
"##,
    )
}

pub fn render_instance_script(
    instance: &Instance,
    set: &ControlSet,
    context: &ScriptContext,
) -> String {
    let slot = &instance.slot;
    let mut out = String::new();

    out.push_str(&format!("const {slot} = new rive.Rive({{\n"));
    out.push_str(&format!("  src: {},\n", js_string(&instance.src)));
    out.push_str(&format!(
        "  canvas: document.getElementById({}),\n",
        js_string(&instance.canvas_id())
    ));
    out.push_str("  autoplay: true,\n");
    if !instance.artboard.is_empty() {
        out.push_str(&format!("  artboard: {},\n", js_string(&instance.artboard)));
    }
    out.push_str(&format!(
        "  stateMachines: {},\n",
        js_string(&instance.state_machine)
    ));
    if set.uses_view_model() {
        out.push_str("  autoBind: true,\n");
    }
    out.push_str("  onLoad: () => {\n");
    out.push_str(&format!("    {slot}.resizeDrawingSurfaceToCanvas();\n"));
    if !set.bindings.is_empty() {
        out.push_str(&format!("    bind_{slot}();\n"));
    }
    out.push_str("  },\n");
    out.push_str("});\n");

    if set.bindings.is_empty() {
        return out;
    }

    out.push_str(&format!("function bind_{slot}() {{\n"));
    if set.uses_state_machine_inputs() {
        out.push_str(&format!(
            "  const inputs = {slot}.stateMachineInputs({}) || [];\n",
            js_string(&instance.state_machine)
        ));
        out.push_str("  const findInput = (name) => inputs.find((input) => input.name === name);\n");
    }
    if set.uses_view_model() {
        out.push_str(&format!("  const vmi = {slot}.viewModelInstance;\n"));
    }
    for binding in &set.bindings {
        out.push_str(&render_binding(slot, binding, context));
    }
    out.push_str("}\n");
    out
}

fn render_binding(slot: &str, binding: &Binding, context: &ScriptContext) -> String {
    if let BindingTarget::ViewModelList { property, element } = &binding.target {
        return render_list_binding(slot, property, element);
    }
    let Some(source) = binding.source_element.as_deref() else {
        return String::new();
    };

    let element = format!("document.getElementById({})", js_string(source));
    if let BindingTarget::StateMachineTrigger { input } = &binding.target {
        return format!(
            "  {element}.addEventListener(\"click\", () => {{\n    const input = findInput({});\n    if (input) input.fire();\n  }});\n",
            js_string(input)
        );
    }
    if let BindingTarget::ViewModelImage { property } = &binding.target {
        return render_image_binding(&element, property, binding.apply, context);
    }

    let assign = match &binding.target {
        BindingTarget::StateMachineNumber { input } => format!(
            "const input = findInput({});\n      if (input) input.value = Number(el.value);",
            js_string(input)
        ),
        BindingTarget::StateMachineBoolean { input } => format!(
            "const input = findInput({});\n      if (input) input.value = el.checked;",
            js_string(input)
        ),
        BindingTarget::ViewModelString { property } => format!(
            "const prop = vmi && vmi.string({});\n      if (prop) prop.value = el.value;",
            js_string(property)
        ),
        BindingTarget::ViewModelNumber { property } => format!(
            "const prop = vmi && vmi.number({});\n      if (prop) prop.value = Number(el.value);",
            js_string(property)
        ),
        BindingTarget::ViewModelBoolean { property } => format!(
            "const prop = vmi && vmi.boolean({});\n      if (prop) prop.value = el.checked;",
            js_string(property)
        ),
        BindingTarget::ViewModelColor { property } => format!(
            "const prop = vmi && vmi.color({});\n      if (prop) prop.value = toArgb(el.value);",
            js_string(property)
        ),
        BindingTarget::StateMachineTrigger { .. }
        | BindingTarget::ViewModelImage { .. }
        | BindingTarget::ViewModelList { .. } => return String::new(),
    };
    let event = match binding.target {
        BindingTarget::StateMachineBoolean { .. } | BindingTarget::ViewModelBoolean { .. } => {
            "change"
        }
        _ => "input",
    };

    let mut out = String::from("  {\n");
    out.push_str(&format!("    const el = {element};\n"));
    out.push_str(&format!("    const apply = () => {{\n      {assign}\n    }};\n"));
    if binding.apply == ApplyOn::LoadAndChange {
        out.push_str("    apply();\n");
    }
    out.push_str(&format!("    el.addEventListener(\"{event}\", apply);\n"));
    out.push_str("  }\n");
    out
}

fn render_image_binding(
    element: &str,
    property: &str,
    apply: ApplyOn,
    context: &ScriptContext,
) -> String {
    let mut out = String::from("  {\n");
    out.push_str(&format!("    const el = {element};\n"));
    out.push_str("    let current = null;\n");
    out.push_str("    const apply = async () => {\n");
    out.push_str(&format!(
        "      const prop = vmi && vmi.image({});\n",
        js_string(property)
    ));
    out.push_str("      const file = el.value.trim();\n");
    out.push_str("      if (!prop || !file) return;\n");
    out.push_str(&format!(
        "      const response = await fetch({} + file);\n",
        js_string(&context.images_base)
    ));
    out.push_str("      if (!response.ok) return;\n");
    out.push_str(
        "      const decoded = await rive.decodeImage(new Uint8Array(await response.arrayBuffer()));\n",
    );
    out.push_str("      if (current) current.unref();\n");
    out.push_str("      current = decoded;\n");
    out.push_str("      prop.value = decoded;\n");
    out.push_str("    };\n");
    if apply == ApplyOn::LoadAndChange {
        out.push_str("    apply();\n");
    }
    out.push_str("    el.addEventListener(\"change\", apply);\n");
    out.push_str("  }\n");
    out
}

/// Collects the list's element instances and registers a per-element setter
/// under `riveLists["<slot>:<list>"]`.
fn render_list_binding(slot: &str, property: &str, element: &ListElement) -> String {
    let accessor = match element.kind {
        InputKind::Number | InputKind::ViewModelNumber => "number",
        InputKind::Text => "string",
        InputKind::Boolean | InputKind::ViewModelBoolean => "boolean",
        InputKind::Color => "color",
        InputKind::ViewModelImage | InputKind::List => return String::new(),
    };
    let convert = match element.kind {
        InputKind::Number | InputKind::ViewModelNumber => "Number(value)",
        InputKind::Text => "String(value)",
        InputKind::Color => "toArgb(value)",
        _ => "Boolean(value)",
    };
    let key = format!("{slot}:{property}");

    let mut out = String::from("  {\n");
    out.push_str(&format!(
        "    const list = vmi && vmi.list({});\n",
        js_string(property)
    ));
    out.push_str("    const items = [];\n");
    out.push_str("    if (list) for (let i = 0; i < list.length; i++) items.push(list.instanceAt(i));\n");
    out.push_str("    const set = (index, value) => {\n");
    out.push_str(&format!(
        "      const prop = items[index] && items[index].{accessor}({});\n",
        js_string(&element.name)
    ));
    out.push_str(&format!("      if (prop) prop.value = {convert};\n"));
    out.push_str("    };\n");
    out.push_str(&format!(
        "    window.riveLists[{}] = {{ items, set }};\n",
        js_string(&key)
    ));
    if let Some(default) = list_default_literal(element) {
        out.push_str(&format!(
            "    items.forEach((_, index) => set(index, {default}));\n"
        ));
    }
    out.push_str("  }\n");
    out
}

/// The element default as a typed JS literal, or `None` when it does not fit
/// the element kind.
fn list_default_literal(element: &ListElement) -> Option<String> {
    let default = element.default.as_deref()?;
    let literal = match element.kind {
        InputKind::Number | InputKind::ViewModelNumber => {
            let trimmed = default.trim();
            trimmed
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .map(|_| trimmed.to_owned())
        }
        InputKind::Boolean | InputKind::ViewModelBoolean => {
            parse_bool_literal(default).map(|value| value.to_string())
        }
        InputKind::Color => normalize_hex(default).map(|hex| js_string(&hex)),
        InputKind::Text => Some(js_string(default)),
        InputKind::ViewModelImage | InputKind::List => None,
    };
    if literal.is_none() {
        tracing::debug!(
            "ignoring default '{default}' for list element '{}'",
            element.name
        );
    }
    literal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GalleryConfig;
    use crate::controls::build_control_set;
    use crate::input_spec::parse_row_inputs;
    use crate::table::AssetDescriptor;

    fn asset(trigger: &str, inputs: &[&str]) -> AssetDescriptor {
        AssetDescriptor {
            source: String::from("lamp.riv"),
            width: String::from("400"),
            height: String::from("300"),
            name: String::from("lamp"),
            size: String::new(),
            state_machine: String::from("State Machine 1"),
            artboard: String::new(),
            trigger: trigger.to_owned(),
            duration: String::new(),
            loop_mode: String::new(),
            background: String::new(),
            inputs: inputs.iter().map(|value| (*value).to_owned()).collect(),
        }
    }

    fn script(trigger: &str, inputs: &[&str]) -> String {
        let asset = asset(trigger, inputs);
        let set = build_control_set(
            &asset,
            &parse_row_inputs(&asset),
            "r0",
            &GalleryConfig::default(),
        );
        let instance = Instance {
            slot: String::from("r0"),
            src: String::from("riv/lamp.riv"),
            artboard: String::new(),
            state_machine: asset.state_machine.clone(),
        };
        render_instance_script(
            &instance,
            &set,
            &ScriptContext {
                images_base: String::from("images/"),
            },
        )
    }

    #[test]
    fn html_and_js_escaping() {
        assert_eq!(escape_html("<a href=\"x\">&'"), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
        assert_eq!(js_string("say \"hi\""), "\"say \\\"hi\\\"\"");
        assert_eq!(js_string("</script>"), "\"<\\/script>\"");
    }

    #[test]
    fn plain_asset_has_no_binding_function() {
        let js = script("", &[]);
        assert!(js.contains("const r0 = new rive.Rive({"));
        assert!(js.contains("stateMachines: \"State Machine 1\""));
        assert!(!js.contains("bind_r0"));
        assert!(!js.contains("autoBind"));
    }

    #[test]
    fn trigger_fires_named_input() {
        let js = script("Pulse", &[]);
        assert!(js.contains("bind_r0();"));
        assert!(js.contains("document.getElementById(\"r0_trigger\").addEventListener(\"click\""));
        assert!(js.contains("findInput(\"Pulse\")"));
        assert!(js.contains("input.fire()"));
    }

    #[test]
    fn color_binding_uses_argb_helper() {
        let js = script("", &["col:Tint"]);
        assert!(js.contains("autoBind: true"));
        assert!(js.contains("vmi.color(\"Tint\")"));
        assert!(js.contains("toArgb(el.value)"));
        assert!(render_script_prelude().contains("0xFF000000 |"));
    }

    #[test]
    fn image_binding_releases_previous_image() {
        let js = script("", &["img:Cover"]);
        assert!(js.contains("fetch(\"images/\" + file)"));
        let unref = js.find("current.unref()").expect("unref");
        let assign = js.find("prop.value = decoded").expect("assign");
        assert!(unref < assign);
        assert!(!js.contains("    apply();\n"));
    }

    #[test]
    fn number_binding_applies_on_load() {
        let js = script("", &["Speed"]);
        assert!(js.contains("stateMachineInputs(\"State Machine 1\")"));
        assert!(js.contains("input.value = Number(el.value)"));
        assert!(js.contains("    apply();\n"));
        assert!(js.contains("addEventListener(\"input\", apply)"));
    }

    #[test]
    fn list_binding_registers_setter_without_control() {
        let js = script("", &["list:Bars[num:Height(4)]"]);
        assert!(js.contains("vmi.list(\"Bars\")"));
        assert!(js.contains("items[index].number(\"Height\")"));
        assert!(js.contains("window.riveLists[\"r0:Bars\"]"));
        assert!(js.contains("set(index, 4)"));
    }

    #[test]
    fn boolean_list_defaults_are_typed_literals() {
        let js = script("", &["list:Flags[bool:On(false)]"]);
        assert!(js.contains("prop.value = Boolean(value)"));
        assert!(js.contains("set(index, false)"));
        assert!(!js.contains("set(index, \"false\")"));

        let off = script("", &["list:Flags[bool:On(off)]"]);
        assert!(off.contains("set(index, false)"));

        let on = script("", &["list:Flags[vbool:On(Yes)]"]);
        assert!(on.contains("set(index, true)"));
    }

    #[test]
    fn unusable_list_defaults_are_dropped() {
        let js = script("", &["list:Flags[bool:On(maybe)]", "list:Bars[num:Height(tall)]"]);
        assert!(!js.contains("items.forEach"));

        let text = script("", &["list:Labels[txt:Caption(hi)]"]);
        assert!(text.contains("set(index, \"hi\")"));
        let color = script("", &["list:Dots[col:Fill(#ABC)]"]);
        assert!(color.contains("set(index, \"#aabbcc\")"));
    }

    #[test]
    fn prelude_strips_hash_before_parsing_hex() {
        let prelude = render_script_prelude();
        assert!(prelude.contains("replace(\"#\", \"\")"));
        assert!(prelude.starts_with("const toArgb"));
    }

    #[test]
    fn controls_render_with_defaults() {
        let asset = asset("Go", &["bool:Armed(on)", "txt:Title(<b>)"]);
        let set = build_control_set(
            &asset,
            &parse_row_inputs(&asset),
            "r3",
            &GalleryConfig::default(),
        );
        let html = render_controls(&set.controls);
        assert!(html.contains("<button id=\"r3_trigger\" type=\"button\">Go</button>"));
        assert!(html.contains("<input id=\"r3_in1\" type=\"checkbox\" checked> Armed"));
        assert!(html.contains("value=\"&lt;b&gt;\""));
        assert_eq!(render_controls(&[]), "");
    }
}
