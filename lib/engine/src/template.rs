use crate::console::Console;
use crate::xml::{Document, Element};
use scantemplate_prelude::NEW_TEMPLATE_ID;

const ROOT: &str = "ScanTemplate";
const DESCRIPTION: &str = "templateDescription";
const VULNERABILITY_CHECKS: &str = "VulnerabilityChecks";
const ENABLED: &str = "Enabled";
const DISABLED: &str = "Disabled";

const CORRELATE: &str = "correlate";
const UNSAFE: &str = "unsafe";
const POTENTIAL: &str = "potential";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unable to read template document: {0}")]
    Xml(#[from] crate::xml::Error),
    #[error("unexpected root element {0}, expected ScanTemplate")]
    RootInvalid(String),
    #[error("scan template has no id")]
    IdMissing,
}

/// Family of vulnerability checks that can be switched on or off in a template.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CheckKind {
    /// A whole vulnerability category, like `Adobe`.
    Category,
    /// A check type, like `Local` or `Safe`.
    Type,
    /// A single vulnerability check, by id.
    Check,
}

impl CheckKind {
    fn tag(self) -> &'static str {
        match self {
            Self::Category => "VulnCategory",
            Self::Type => "CheckType",
            Self::Check => "Check",
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::Category | Self::Type => "name",
            Self::Check => "id",
        }
    }

    fn matches(self, element: &Element, name: &str) -> bool {
        element.name() == self.tag() && element.attribute(self.key()) == Some(name)
    }

    fn entry(self, name: &str) -> Element {
        Element::new(self.tag()).with_attribute(self.key(), name)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CheckState {
    Enabled,
    Disabled,
    #[default]
    Unset,
}

/// In-memory copy of one scan template configuration.
///
/// Mutations only touch the local document, nothing reaches the console
/// before [`ScanTemplate::save`].
#[derive(Clone, Debug)]
pub struct ScanTemplate {
    document: Document,
    correlate: bool,
}

impl ScanTemplate {
    pub fn from_xml(input: &str) -> Result<Self, Error> {
        let document = Document::parse(input)?;
        let root = document.root();
        if root.name() != ROOT {
            return Err(Error::RootInvalid(root.name().to_string()));
        }
        if root.attribute("id").is_none() {
            return Err(Error::IdMissing);
        }
        let correlate = flag(&document, CORRELATE);
        Ok(Self {
            document,
            correlate,
        })
    }

    /// Serializes the document as it currently is, without the pending `correlate` flag.
    pub fn to_xml(&self) -> Result<String, Error> {
        Ok(self.document.to_xml()?)
    }

    pub fn id(&self) -> &str {
        self.document.root().attribute("id").unwrap_or_default()
    }

    fn set_id(&mut self, value: impl Into<String>) {
        self.document.root_mut().set_attribute("id", value);
    }

    pub fn is_new(&self) -> bool {
        self.id() == NEW_TEMPLATE_ID
    }

    fn description_element(&self) -> Option<&Element> {
        self.document.root().child(DESCRIPTION)
    }

    pub fn name(&self) -> Option<&str> {
        self.description_element()?.attribute("title")
    }

    pub fn set_name(&mut self, value: impl Into<String>) {
        self.document
            .root_mut()
            .child_or_insert(DESCRIPTION)
            .set_attribute("title", value);
    }

    pub fn description(&self) -> Option<String> {
        self.description_element()?.text()
    }

    pub fn set_description(&mut self, value: impl Into<String>) {
        self.document
            .root_mut()
            .child_or_insert(DESCRIPTION)
            .set_text(value);
    }

    /// Whether reliable checks are correlated with regular ones.
    pub fn correlate(&self) -> bool {
        self.correlate
    }

    pub fn set_correlate(&mut self, value: bool) {
        self.correlate = value;
    }

    pub fn unsafe_checks(&self) -> bool {
        flag(&self.document, UNSAFE)
    }

    pub fn set_unsafe_checks(&mut self, value: bool) {
        self.set_flag(UNSAFE, value);
    }

    pub fn potential_checks(&self) -> bool {
        flag(&self.document, POTENTIAL)
    }

    pub fn set_potential_checks(&mut self, value: bool) {
        self.set_flag(POTENTIAL, value);
    }

    fn set_flag(&mut self, name: &str, value: bool) {
        self.document
            .root_mut()
            .child_or_insert(VULNERABILITY_CHECKS)
            .set_attribute(name, if value { "1" } else { "0" });
    }

    fn checks_in(&self, container: &str, kind: CheckKind) -> Vec<&str> {
        self.document
            .root()
            .find(&[VULNERABILITY_CHECKS, container])
            .map(|found| {
                found
                    .children_named(kind.tag())
                    .filter_map(|element| element.attribute(kind.key()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Names of the enabled entries of that kind, in document order.
    pub fn checks_by_kind(&self, kind: CheckKind) -> Vec<&str> {
        self.checks_in(ENABLED, kind)
    }

    pub fn disabled_checks_by_kind(&self, kind: CheckKind) -> Vec<&str> {
        self.checks_in(DISABLED, kind)
    }

    pub fn check_state(&self, name: &str, kind: CheckKind) -> CheckState {
        let contains = |container: &str| {
            self.document
                .root()
                .find(&[VULNERABILITY_CHECKS, container])
                .is_some_and(|found| found.elements().any(|element| kind.matches(element, name)))
        };
        if contains(ENABLED) {
            CheckState::Enabled
        } else if contains(DISABLED) {
            CheckState::Disabled
        } else {
            CheckState::Unset
        }
    }

    /// Drops every entry for that name and kind, then records the new state.
    pub fn set_check_state(&mut self, name: &str, kind: CheckKind, state: CheckState) {
        let root = self.document.root_mut();
        if let Some(checks) = root.child_mut(VULNERABILITY_CHECKS) {
            for container in [ENABLED, DISABLED] {
                if let Some(found) = checks.child_mut(container) {
                    found.retain_elements(|element| !kind.matches(element, name));
                }
            }
        }
        let container = match state {
            CheckState::Enabled => ENABLED,
            CheckState::Disabled => DISABLED,
            CheckState::Unset => return,
        };
        root.child_or_insert(VULNERABILITY_CHECKS)
            .child_or_insert(container)
            .push(kind.entry(name));
    }

    pub fn enable_check(&mut self, name: &str, kind: CheckKind) {
        self.set_check_state(name, kind, CheckState::Enabled);
    }

    pub fn disable_check(&mut self, name: &str, kind: CheckKind) {
        self.set_check_state(name, kind, CheckState::Disabled);
    }

    pub fn remove_check(&mut self, name: &str, kind: CheckKind) {
        self.set_check_state(name, kind, CheckState::Unset);
    }
}

impl ScanTemplate {
    /// Loads a template by id, or the console's blank template when no id is given.
    ///
    /// Templates fetched by id come wrapped in a JSON envelope, the blank one is raw XML.
    pub async fn load(console: &Console, id: Option<&str>) -> Result<Self, crate::Error> {
        let content = match id {
            Some(id) => console.fetch_template(id).await?,
            None => console.fetch_blank_template().await?,
        };
        let template = Self::from_xml(&content)?;
        tracing::debug!("loaded scan template {}", template.id());
        Ok(template)
    }

    /// Creates the template when it has never been saved, updates it otherwise.
    ///
    /// Returns the id given back by the console, which becomes the template id after a creation.
    pub async fn save(&mut self, console: &Console) -> Result<String, crate::Error> {
        self.set_flag(CORRELATE, self.correlate);
        let content = self.to_xml()?;
        if self.is_new() {
            tracing::debug!("creating scan template {:?}", self.name());
            let id = console.create_template(content).await?;
            self.set_id(id.as_str());
            Ok(id)
        } else {
            tracing::debug!("updating scan template {}", self.id());
            Ok(console.update_template(self.id(), content).await?)
        }
    }

    /// Loads an existing template and turns it into a new, unsaved one.
    pub async fn copy(console: &Console, id: &str) -> Result<Self, crate::Error> {
        let mut template = Self::load(console, Some(id)).await?;
        template.set_id(NEW_TEMPLATE_ID);
        let name = format!("{} Copy", template.name().unwrap_or_default());
        template.set_name(name);
        Ok(template)
    }

    /// Removes the template from the console, the local copy stays untouched.
    pub async fn delete(&self, console: &Console) -> Result<(), crate::Error> {
        Ok(console.delete_template(self.id()).await?)
    }
}

fn flag(document: &Document, name: &str) -> bool {
    document
        .root()
        .child(VULNERABILITY_CHECKS)
        .and_then(|checks| checks.attribute(name))
        == Some("1")
}

#[cfg(test)]
mod tests {
    use super::{CheckKind, CheckState, Error, ScanTemplate};
    use crate::console::Console;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const BASE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ScanTemplate id="full-audit">
  <templateDescription title="Base">Audit everything</templateDescription>
  <VulnerabilityChecks correlate="1" potential="0" unsafe="0">
    <Enabled>
      <VulnCategory name="Adobe"/>
      <CheckType name="Local"/>
    </Enabled>
    <Disabled>
      <VulnCategory name="Cisco"/>
    </Disabled>
  </VulnerabilityChecks>
</ScanTemplate>"#;

    const BARE: &str = r#"<ScanTemplate id="bare"/>"#;

    fn template(content: &str) -> ScanTemplate {
        ScanTemplate::from_xml(content).unwrap()
    }

    #[test]
    fn should_read_fields() {
        let tmpl = template(BASE);
        assert_eq!(tmpl.id(), "full-audit");
        assert!(!tmpl.is_new());
        assert_eq!(tmpl.name(), Some("Base"));
        assert_eq!(tmpl.description().as_deref(), Some("Audit everything"));
        assert!(tmpl.correlate());
        assert!(!tmpl.unsafe_checks());
        assert!(!tmpl.potential_checks());
    }

    #[test]
    fn should_fail_with_other_root() {
        let err = ScanTemplate::from_xml(r#"<Site id="1"/>"#).unwrap_err();
        assert!(matches!(err, Error::RootInvalid(name) if name == "Site"));
    }

    #[test]
    fn should_fail_without_id() {
        let err = ScanTemplate::from_xml("<ScanTemplate/>").unwrap_err();
        assert!(matches!(err, Error::IdMissing));
    }

    #[test]
    fn should_fail_with_malformed_xml() {
        let err = ScanTemplate::from_xml("<ScanTemplate id=\"a\"><oops></ScanTemplate>").unwrap_err();
        assert!(matches!(err, Error::Xml(_)));
    }

    #[test]
    fn should_be_absent_without_description() {
        let tmpl = template(BARE);
        assert_eq!(tmpl.name(), None);
        assert_eq!(tmpl.description(), None);
        assert!(!tmpl.correlate());
    }

    #[test]
    fn should_set_name_without_description() {
        let mut tmpl = template(BARE);
        tmpl.set_name("Fresh");
        assert_eq!(tmpl.name(), Some("Fresh"));
        assert_eq!(tmpl.description(), None);
    }

    #[test]
    fn should_set_description_without_name() {
        let mut tmpl = template(BARE);
        tmpl.set_description("Only text");
        assert_eq!(tmpl.description().as_deref(), Some("Only text"));
        assert_eq!(tmpl.name(), None);
    }

    #[test]
    fn should_not_clobber_name_or_description() {
        let mut tmpl = template(BARE);
        tmpl.set_name("Fresh");
        tmpl.set_description("Some text");
        tmpl.set_name("Renamed");
        assert_eq!(tmpl.name(), Some("Renamed"));
        assert_eq!(tmpl.description().as_deref(), Some("Some text"));
        let xml = tmpl.to_xml().unwrap();
        assert_eq!(xml.matches("<templateDescription").count(), 1);

        let mut tmpl = template(BASE);
        tmpl.set_description("Changed");
        assert_eq!(tmpl.name(), Some("Base"));
        assert_eq!(tmpl.description().as_deref(), Some("Changed"));
    }

    #[test]
    fn should_list_enabled_checks_in_order() {
        let mut tmpl = template(BASE);
        tmpl.enable_check("Microsoft", CheckKind::Category);
        assert_eq!(
            tmpl.checks_by_kind(CheckKind::Category),
            vec!["Adobe", "Microsoft"]
        );
        assert_eq!(tmpl.checks_by_kind(CheckKind::Type), vec!["Local"]);
        assert_eq!(
            tmpl.disabled_checks_by_kind(CheckKind::Category),
            vec!["Cisco"]
        );
    }

    #[test]
    fn should_move_check_between_states() {
        let mut tmpl = template(BASE);
        tmpl.enable_check("Cisco", CheckKind::Category);
        assert_eq!(tmpl.check_state("Cisco", CheckKind::Category), CheckState::Enabled);
        assert!(tmpl.disabled_checks_by_kind(CheckKind::Category).is_empty());

        tmpl.disable_check("Cisco", CheckKind::Category);
        assert_eq!(tmpl.check_state("Cisco", CheckKind::Category), CheckState::Disabled);
        assert!(!tmpl.checks_by_kind(CheckKind::Category).contains(&"Cisco"));
        assert_eq!(
            tmpl.disabled_checks_by_kind(CheckKind::Category),
            vec!["Cisco"]
        );

        tmpl.remove_check("Cisco", CheckKind::Category);
        assert_eq!(tmpl.check_state("Cisco", CheckKind::Category), CheckState::Unset);
        assert!(!tmpl.checks_by_kind(CheckKind::Category).contains(&"Cisco"));
        assert!(tmpl.disabled_checks_by_kind(CheckKind::Category).is_empty());
    }

    // enabling twice keeps a single entry instead of appending a duplicate
    #[test]
    fn should_not_duplicate_enabled_check() {
        let mut tmpl = template(BASE);
        tmpl.enable_check("Adobe", CheckKind::Category);
        tmpl.enable_check("Adobe", CheckKind::Category);
        assert_eq!(tmpl.checks_by_kind(CheckKind::Category), vec!["Adobe"]);
        tmpl.disable_check("Local", CheckKind::Type);
        tmpl.disable_check("Local", CheckKind::Type);
        assert_eq!(tmpl.disabled_checks_by_kind(CheckKind::Type), vec!["Local"]);
    }

    #[test]
    fn should_keep_kinds_apart() {
        let mut tmpl = template(BASE);
        tmpl.disable_check("Adobe", CheckKind::Type);
        assert_eq!(tmpl.check_state("Adobe", CheckKind::Category), CheckState::Enabled);
        assert_eq!(tmpl.check_state("Adobe", CheckKind::Type), CheckState::Disabled);
        tmpl.remove_check("Adobe", CheckKind::Type);
        assert_eq!(tmpl.checks_by_kind(CheckKind::Category), vec!["Adobe"]);
    }

    #[test]
    fn should_ignore_removal_of_unknown_check() {
        let mut tmpl = template(BARE);
        tmpl.remove_check("Adobe", CheckKind::Category);
        assert_eq!(tmpl.to_xml().unwrap(), BARE);
    }

    #[test]
    fn should_create_containers_lazily() {
        let mut tmpl = template(BARE);
        tmpl.enable_check("12345", CheckKind::Check);
        tmpl.disable_check("Remote", CheckKind::Type);
        assert_eq!(tmpl.checks_by_kind(CheckKind::Check), vec!["12345"]);
        assert_eq!(tmpl.disabled_checks_by_kind(CheckKind::Type), vec!["Remote"]);
        let xml = tmpl.to_xml().unwrap();
        assert!(xml.contains(r#"<Check id="12345"/>"#));
        assert!(xml.contains(r#"<CheckType name="Remote"/>"#));
    }

    #[test]
    fn should_write_flags_immediately() {
        let mut tmpl = template(BARE);
        tmpl.set_unsafe_checks(true);
        tmpl.set_potential_checks(true);
        assert!(tmpl.unsafe_checks());
        assert!(tmpl.potential_checks());
        let xml = tmpl.to_xml().unwrap();
        assert!(xml.contains(r#"unsafe="1""#));
        assert!(xml.contains(r#"potential="1""#));
    }

    #[test]
    fn should_keep_correlate_in_memory_until_save() {
        let mut tmpl = template(BASE);
        tmpl.set_correlate(false);
        tmpl.set_correlate(true);
        tmpl.set_correlate(false);
        assert!(!tmpl.correlate());
        assert!(tmpl.to_xml().unwrap().contains(r#"correlate="1""#));
    }

    #[tokio::test]
    async fn should_load_by_id_from_envelope() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/scan/templates/full-audit"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "value": BASE,
            })))
            .mount(&mock_server)
            .await;

        let console = Console::new(mock_server.uri());
        let tmpl = ScanTemplate::load(&console, Some("full-audit")).await.unwrap();
        assert_eq!(tmpl.id(), "full-audit");
        assert_eq!(tmpl.name(), Some("Base"));
    }

    #[tokio::test]
    async fn should_load_blank_template_as_raw_xml() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ajax/scantemplate_config.txml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r##"<ScanTemplate id="#NewScanTemplate#"><VulnerabilityChecks/></ScanTemplate>"##,
            ))
            .mount(&mock_server)
            .await;

        let console = Console::new(mock_server.uri());
        let tmpl = ScanTemplate::load(&console, None).await.unwrap();
        assert!(tmpl.is_new());
        assert!(!tmpl.correlate());
    }

    #[tokio::test]
    async fn should_read_correlate_from_blank_template() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ajax/scantemplate_config.txml"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r##"<ScanTemplate id="#NewScanTemplate#"><VulnerabilityChecks correlate="1"/></ScanTemplate>"##,
            ))
            .mount(&mock_server)
            .await;

        let console = Console::new(mock_server.uri());
        let tmpl = ScanTemplate::load(&console, None).await.unwrap();
        assert!(tmpl.is_new());
        assert!(tmpl.correlate());
    }

    #[tokio::test]
    async fn should_fail_loading_invalid_template() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/scan/templates/broken"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "value": "<ScanTemplate",
            })))
            .mount(&mock_server)
            .await;

        let console = Console::new(mock_server.uri());
        let err = ScanTemplate::load(&console, Some("broken")).await.unwrap_err();
        assert!(matches!(err, crate::Error::Template(_)));
    }

    #[tokio::test]
    async fn should_create_new_template() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/data/scan/templates"))
            .and(header("content-type", "text/xml; charset=UTF-8"))
            .and(body_string_contains(r#"correlate="1""#))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "value": "assigned-id",
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let console = Console::new(mock_server.uri());
        let mut tmpl = template(r##"<ScanTemplate id="#NewScanTemplate#"/>"##);
        tmpl.set_correlate(true);
        let id = tmpl.save(&console).await.unwrap();
        assert_eq!(id, "assigned-id");
        assert_eq!(tmpl.id(), "assigned-id");
        assert!(!tmpl.is_new());
    }

    #[tokio::test]
    async fn should_update_existing_template() {
        let mock_server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/data/scan/templates/full-audit"))
            .and(body_string_contains(r#"correlate="0""#))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "value": "full-audit",
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let console = Console::new(mock_server.uri());
        let mut tmpl = template(BASE);
        tmpl.set_correlate(false);
        let id = tmpl.save(&console).await.unwrap();
        assert_eq!(id, "full-audit");
    }

    #[tokio::test]
    async fn should_propagate_save_failure() {
        let mock_server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/data/scan/templates/full-audit"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let console = Console::new(mock_server.uri());
        let mut tmpl = template(BASE);
        let err = tmpl.save(&console).await.unwrap_err();
        match err {
            crate::Error::Console(inner) => {
                assert_eq!(inner.status(), Some(reqwest::StatusCode::INTERNAL_SERVER_ERROR))
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn should_copy_template() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/scan/templates/T1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "value": r#"<ScanTemplate id="T1"><templateDescription title="Base"/></ScanTemplate>"#,
            })))
            .mount(&mock_server)
            .await;

        let console = Console::new(mock_server.uri());
        let tmpl = ScanTemplate::copy(&console, "T1").await.unwrap();
        assert_eq!(tmpl.id(), "#NewScanTemplate#");
        assert_eq!(tmpl.name(), Some("Base Copy"));
    }

    #[tokio::test]
    async fn should_delete_and_keep_local_copy() {
        let mock_server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/data/scan/templates/full-audit"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&mock_server)
            .await;

        let console = Console::new(mock_server.uri());
        let tmpl = template(BASE);
        tmpl.delete(&console).await.unwrap();
        assert_eq!(tmpl.name(), Some("Base"));
    }
}
