/// Identifier carried by a template that has never been saved on the console.
pub const NEW_TEMPLATE_ID: &str = "#NewScanTemplate#";

/// Collection of scan templates, relative to the console root.
pub const TEMPLATES_PATH: &str = "data/scan/templates";

/// Default configuration the console hands out for a brand new template.
pub const BLANK_TEMPLATE_PATH: &str = "ajax/scantemplate_config.txml";

/// Envelope wrapping a single value, as returned when fetching or saving a template.
#[derive(Debug, serde::Deserialize, serde::Serialize)]
pub struct Value<T> {
    pub value: T,
}

/// Envelope wrapping a list of values, as returned when listing templates.
#[derive(Debug, serde::Deserialize, serde::Serialize)]
pub struct ValueList<T> {
    #[serde(rename = "valueList")]
    pub value_list: Vec<T>,
}
