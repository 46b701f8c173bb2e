use bic_contract::{Affordance, Form, FormFieldRef};

pub const FORM_CONTROL_ROLES: &[&str] = &[
    "textbox",
    "searchbox",
    "combobox",
    "listbox",
    "option",
    "checkbox",
    "radio",
    "switch",
    "slider",
    "spinbutton",
];

pub const MAIN_SECTION: &str = "Main";

/// Groups form controls into a single "Main" section, in page order.
pub fn derive_forms(affordances: &[Affordance]) -> Vec<Form> {
    let fields: Vec<FormFieldRef> = affordances
        .iter()
        .filter(|a| FORM_CONTROL_ROLES.contains(&a.role.as_str()))
        .map(|a| FormFieldRef {
            action_id: a.action_id.clone(),
        })
        .collect();

    if fields.is_empty() {
        return Vec::new();
    }
    vec![Form {
        section: Some(MAIN_SECTION.to_string()),
        fields,
    }]
}
