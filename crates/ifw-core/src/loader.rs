//! The rule loader (§4.E): enumerates `.xml` files under a writable and a
//! set of read-only directories, parses each into rules, and assembles a
//! fresh [`StoreData`].
//!
//! XML tokenization itself is out of scope (§1) — this module only
//! *consumes* the pull-style token stream `quick_xml::Reader` produces.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use ifw_events::{Component, DispatchKind};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, warn};

use crate::error::{LoadError, ParseError};
use crate::predicate::{IntentFilterSpec, MatchMode, Predicate, PortSpec, Role, RoleClass, StringAttr};
use crate::resolver::Resolver;
use crate::rule::{Effects, Rule, RuleId};
use crate::store::StoreData;

/// A generic XML element, independent of the domain it describes — the
/// boundary between "consuming the token stream" and "interpreting a rule".
struct XmlNode {
    tag: String,
    attrs: HashMap<String, String>,
    children: Vec<XmlNode>,
}

fn read_attrs(start: &BytesStart) -> Result<HashMap<String, String>, quick_xml::Error> {
    let mut attrs = HashMap::new();
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attrs.insert(key, value);
    }
    Ok(attrs)
}

fn parse_node(
    reader: &mut Reader<&[u8]>,
    buf: &mut Vec<u8>,
    start: &BytesStart,
) -> Result<XmlNode, quick_xml::Error> {
    let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let attrs = read_attrs(start)?;
    let mut children = Vec::new();

    loop {
        buf.clear();
        match reader.read_event_into(buf)? {
            Event::Start(e) => {
                let e = e.into_owned();
                children.push(parse_node(reader, buf, &e)?);
            }
            Event::Empty(e) => {
                let child_tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                let child_attrs = read_attrs(&e)?;
                children.push(XmlNode {
                    tag: child_tag,
                    attrs: child_attrs,
                    children: Vec::new(),
                });
            }
            Event::End(_) => break,
            Event::Eof => {
                return Err(quick_xml::Error::UnexpectedEof(tag));
            }
            _ => {}
        }
    }

    Ok(XmlNode { tag, attrs, children })
}

fn bool_attr(attrs: &HashMap<String, String>, name: &str) -> bool {
    attrs.get(name).is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

const MATCH_MODE_NAMES: [(&str, MatchMode); 5] = [
    ("equals", MatchMode::Equals),
    ("starts-with", MatchMode::StartsWith),
    ("contains", MatchMode::Contains),
    ("pattern", MatchMode::Pattern),
    ("regex", MatchMode::Regex),
];

fn read_match_mode(tag: &str, attrs: &HashMap<String, String>) -> Result<(MatchMode, String), ParseError> {
    let mut found = None;
    for (name, mode) in MATCH_MODE_NAMES {
        if let Some(v) = attrs.get(name) {
            if found.is_some() {
                return Err(ParseError::AmbiguousMatchMode { tag: tag.to_string() });
            }
            found = Some((mode, v.clone()));
        }
    }
    found.ok_or_else(|| ParseError::MissingMatchMode { tag: tag.to_string() })
}

fn required_attr<'a>(tag: &str, attrs: &'a HashMap<String, String>, name: &str) -> Result<&'a str, ParseError> {
    attrs
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| ParseError::MissingAttribute {
            tag: tag.to_string(),
            attr: name.to_string(),
        })
}

fn parse_intent_filter(node: &XmlNode) -> Result<IntentFilterSpec, ParseError> {
    let mut spec = IntentFilterSpec::default();
    for child in &node.children {
        match child.tag.as_str() {
            "action" => spec.actions.push(required_attr("action", &child.attrs, "name")?.to_string()),
            "category" => spec
                .categories
                .push(required_attr("category", &child.attrs, "name")?.to_string()),
            "data" => {
                if let Some(scheme) = child.attrs.get("scheme") {
                    spec.data_schemes.push(scheme.to_lowercase());
                }
                if let Some(host) = child.attrs.get("host") {
                    spec.data_hosts.push(host.to_lowercase());
                }
                if let Some(mime) = child.attrs.get("mimeType") {
                    spec.mime_types.push(mime.to_lowercase());
                }
            }
            other => return Err(ParseError::UnknownFilterAttribute(other.to_string())),
        }
    }
    Ok(spec)
}

fn parse_port(node: &XmlNode) -> Result<PortSpec, ParseError> {
    if let Some(v) = node.attrs.get("port") {
        let p: u16 = v.parse().map_err(|_| ParseError::BadPort(v.clone()))?;
        return Ok(PortSpec::Exact(p));
    }
    let start = required_attr("port", &node.attrs, "start")?;
    let end = required_attr("port", &node.attrs, "end")?;
    let start: u16 = start.parse().map_err(|_| ParseError::BadPort(start.to_string()))?;
    let end: u16 = end.parse().map_err(|_| ParseError::BadPort(end.to_string()))?;
    Ok(PortSpec::Range(start, end))
}

fn parse_role_class(tag: &str, attrs: &HashMap<String, String>) -> Result<RoleClass, ParseError> {
    match required_attr(tag, attrs, "type")? {
        "signature" => Ok(RoleClass::Signature),
        "system" => Ok(RoleClass::System),
        "user" => Ok(RoleClass::User),
        other => Err(ParseError::MissingAttribute {
            tag: tag.to_string(),
            attr: format!("type (unrecognized value `{other}`)"),
        }),
    }
}

fn parse_predicate(node: &XmlNode) -> Result<Predicate, ParseError> {
    match node.tag.as_str() {
        "and" => Ok(Predicate::And(
            node.children.iter().map(parse_predicate).collect::<Result<_, _>>()?,
        )),
        "or" => Ok(Predicate::Or(
            node.children.iter().map(parse_predicate).collect::<Result<_, _>>()?,
        )),
        "not" => {
            if node.children.len() != 1 {
                return Err(ParseError::NotArity {
                    found: node.children.len(),
                });
            }
            Ok(Predicate::Not(Box::new(parse_predicate(&node.children[0])?)))
        }
        "action" => string_leaf(StringAttr::Action, "action", &node.attrs),
        "component" => string_leaf(StringAttr::Component, "component", &node.attrs),
        "component-name" => string_leaf(StringAttr::ComponentName, "component-name", &node.attrs),
        "component-package" => string_leaf(StringAttr::ComponentPackage, "component-package", &node.attrs),
        "data" => string_leaf(StringAttr::Data, "data", &node.attrs),
        "host" => string_leaf(StringAttr::Host, "host", &node.attrs),
        "mime-type" => string_leaf(StringAttr::MimeType, "mime-type", &node.attrs),
        "scheme" => string_leaf(StringAttr::Scheme, "scheme", &node.attrs),
        "path" => string_leaf(StringAttr::Path, "path", &node.attrs),
        "ssp" => string_leaf(StringAttr::Ssp, "ssp", &node.attrs),
        "category" => Ok(Predicate::Category(required_attr("category", &node.attrs, "name")?.to_string())),
        "port" => Ok(Predicate::Port(parse_port(node)?)),
        "sender" => Ok(Predicate::RoleType {
            role: Role::Sender,
            class: parse_role_class("sender", &node.attrs)?,
        }),
        "target" => Ok(Predicate::RoleType {
            role: Role::Target,
            class: parse_role_class("target", &node.attrs)?,
        }),
        "sender-package" => Ok(Predicate::RolePackage {
            role: Role::Sender,
            package: required_attr("sender-package", &node.attrs, "name")?.to_string(),
        }),
        "target-package" => Ok(Predicate::RolePackage {
            role: Role::Target,
            package: required_attr("target-package", &node.attrs, "name")?.to_string(),
        }),
        "sender-permission" => Ok(Predicate::RolePermission {
            role: Role::Sender,
            permission: required_attr("sender-permission", &node.attrs, "name")?.to_string(),
        }),
        "target-permission" => Ok(Predicate::RolePermission {
            role: Role::Target,
            permission: required_attr("target-permission", &node.attrs, "name")?.to_string(),
        }),
        "intent-filter" => Ok(Predicate::IntentFilter(parse_intent_filter(node)?)),
        "provisioned" => Ok(Predicate::Provisioned),
        other => Err(ParseError::UnknownPredicate(other.to_string())),
    }
}

fn string_leaf(attr: StringAttr, tag: &str, attrs: &HashMap<String, String>) -> Result<Predicate, ParseError> {
    let (mode, literal) = read_match_mode(tag, attrs)?;
    Ok(Predicate::StringMatch { attr, mode, literal })
}

fn node_to_rule(node: &XmlNode) -> Result<Rule, ParseError> {
    let package_name = node.attrs.get("pkgName").cloned();
    let effects = Effects {
        block: bool_attr(&node.attrs, "block"),
        log_on_block_path: bool_attr(&node.attrs, "log"),
        block_query: bool_attr(&node.attrs, "blockquery"),
        log_on_query_path: bool_attr(&node.attrs, "logquery"),
    };
    let match_all = bool_attr(&node.attrs, "matchall");

    let mut intent_filters = Vec::new();
    let mut component_filters = Vec::new();
    let mut predicate_children = Vec::new();

    for child in &node.children {
        match child.tag.as_str() {
            "intent-filter" => intent_filters.push(parse_intent_filter(child)?),
            "component-filter" => {
                let name = required_attr("component-filter", &child.attrs, "name")?;
                let component = Component::parse(name).ok_or_else(|| ParseError::BadComponent(name.to_string()))?;
                component_filters.push(component);
            }
            _ => predicate_children.push(parse_predicate(child)?),
        }
    }

    if match_all && (!intent_filters.is_empty() || !component_filters.is_empty()) {
        return Err(ParseError::MatchAllWithFilters);
    }

    Ok(Rule {
        package_name,
        effects,
        match_all,
        predicate: Predicate::And(predicate_children),
        intent_filters,
        component_filters,
    })
}

fn dispatch_kind_for_tag(tag: &str) -> Option<DispatchKind> {
    match tag {
        "activity" => Some(DispatchKind::Activity),
        "service" => Some(DispatchKind::Service),
        "broadcast" => Some(DispatchKind::Broadcast),
        "provider" => Some(DispatchKind::Provider),
        "package" => Some(DispatchKind::Package),
        _ => None,
    }
}

/// Tally of a load pass, for the one-line summary log (§4.E) and for tests
/// that want to assert on discard counts directly.
#[derive(Debug, Default, Clone)]
pub struct LoadSummary {
    pub accepted_by_kind: HashMap<DispatchKind, usize>,
    pub discarded_rules: usize,
    pub discarded_files: usize,
}

/// Parses one file's content into `(kind, node)` pairs for every recognized
/// top-level child of its `<rules>` root. File-level failures (missing
/// root, malformed XML) are returned as `Err`; everything past this point is
/// per-rule.
fn parse_file(content: &str, path: &Path) -> Result<Vec<(DispatchKind, XmlNode)>, LoadError> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text = true;
    let mut buf = Vec::new();

    let found_root = loop {
        buf.clear();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.name().as_ref() == b"rules" => break true,
            Ok(Event::Eof) => break false,
            Ok(_) => continue,
            Err(err) => {
                return Err(LoadError::Xml {
                    path: path.to_path_buf(),
                    err,
                })
            }
        }
    };
    if !found_root {
        return Err(LoadError::MissingRoot { path: path.to_path_buf() });
    }

    let mut entries = Vec::new();
    loop {
        buf.clear();
        let event = reader.read_event_into(&mut buf).map_err(|err| LoadError::Xml {
            path: path.to_path_buf(),
            err,
        })?;
        match event {
            Event::Start(e) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                let e = e.into_owned();
                let node = parse_node(&mut reader, &mut buf, &e).map_err(|err| LoadError::Xml {
                    path: path.to_path_buf(),
                    err,
                })?;
                if let Some(kind) = dispatch_kind_for_tag(&tag) {
                    entries.push((kind, node));
                }
            }
            Event::Empty(e) => {
                let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if let Some(kind) = dispatch_kind_for_tag(&tag) {
                    let attrs = read_attrs(&e).map_err(|err| LoadError::Xml {
                        path: path.to_path_buf(),
                        err,
                    })?;
                    entries.push((
                        kind,
                        XmlNode {
                            tag,
                            attrs,
                            children: Vec::new(),
                        },
                    ));
                }
            }
            Event::End(e) if e.name().as_ref() == b"rules" => break,
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(entries)
}

/// Enumerates every `.xml` file in `dirs`, in order (writable first, then
/// read-only), unions their contents, and installs the parsed rules into a
/// fresh [`StoreData`] (§4.E).
pub fn load_directories<'a>(dirs: impl Iterator<Item = &'a Path>) -> (StoreData, LoadSummary) {
    let mut rules = Vec::new();
    let mut activity = Resolver::new();
    let mut broadcast = Resolver::new();
    let mut service = Resolver::new();
    let mut provider = Resolver::new();
    let mut package_rules = Vec::new();
    let mut summary = LoadSummary::default();

    for dir in dirs {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                debug!(dir = %dir.display(), %err, "rules directory unreadable, skipping");
                continue;
            }
        };

        let mut paths: Vec<_> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "xml"))
            .collect();
        paths.sort();

        for path in paths {
            let content = match fs::read_to_string(&path) {
                Ok(content) => content,
                Err(err) => {
                    let err = LoadError::Io { path: path.clone(), err };
                    warn!(%err, "failed to read rules file, discarding");
                    summary.discarded_files += 1;
                    continue;
                }
            };

            let entries = match parse_file(&content, &path) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!(path = %path.display(), %err, "malformed rules file, discarding");
                    summary.discarded_files += 1;
                    continue;
                }
            };

            for (kind, node) in entries {
                match node_to_rule(&node) {
                    Ok(rule) => {
                        let id = RuleId(rules.len());
                        let match_all = rule.match_all;
                        let intent_filters = rule.intent_filters.clone();
                        let component_filters = rule.component_filters.clone();
                        rules.push(rule);
                        *summary.accepted_by_kind.entry(kind).or_insert(0) += 1;

                        match kind {
                            DispatchKind::Package => package_rules.push(id),
                            _ => {
                                let resolver = match kind {
                                    DispatchKind::Activity => &mut activity,
                                    DispatchKind::Broadcast => &mut broadcast,
                                    DispatchKind::Service => &mut service,
                                    DispatchKind::Provider => &mut provider,
                                    DispatchKind::Package => unreachable!(),
                                };
                                if match_all {
                                    resolver.register_match_all(id);
                                } else {
                                    for filter in intent_filters {
                                        resolver.register_intent_filter(filter, id);
                                    }
                                    for component in component_filters {
                                        resolver.register_component(component, id);
                                    }
                                }
                            }
                        }
                    }
                    Err(err) => {
                        warn!(path = %path.display(), %err, "malformed rule, discarding");
                        summary.discarded_rules += 1;
                    }
                }
            }
        }
    }

    debug!(
        accepted = ?summary.accepted_by_kind,
        discarded_rules = summary.discarded_rules,
        discarded_files = summary.discarded_files,
        "rule load complete"
    );

    (
        StoreData {
            rules,
            activity,
            broadcast,
            service,
            provider,
            package_rules,
        },
        summary,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, content: &str) {
        let mut f = fs::File::create(dir.join(name)).unwrap();
        f.write_all(content.as_bytes()).unwrap();
    }

    #[test]
    fn parses_action_block_rule() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "a.xml",
            r#"<rules>
                <activity block="true">
                  <intent-filter><action name="a.b.C"/></intent-filter>
                </activity>
            </rules>"#,
        );
        let (store, summary) = load_directories(std::iter::once(dir.path()));
        assert_eq!(summary.discarded_rules, 0);
        assert_eq!(summary.discarded_files, 0);
        assert_eq!(store.rules.len(), 1);
        assert!(store.rules[0].effects.block);
    }

    #[test]
    fn malformed_not_is_discarded_valid_rule_survives() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "b.xml",
            r#"<rules>
                <activity block="true" matchall="true">
                  <not/>
                </activity>
                <activity block="true" matchall="true"/>
            </rules>"#,
        );
        let (store, summary) = load_directories(std::iter::once(dir.path()));
        assert_eq!(summary.discarded_rules, 1);
        assert_eq!(store.rules.len(), 1);
    }

    #[test]
    fn missing_root_discards_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "c.xml", "<notrules></notrules>");
        let (store, summary) = load_directories(std::iter::once(dir.path()));
        assert_eq!(summary.discarded_files, 1);
        assert!(store.rules.is_empty());
    }

    #[test]
    fn non_xml_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "readme.txt", "not rules");
        let (store, _summary) = load_directories(std::iter::once(dir.path()));
        assert!(store.rules.is_empty());
    }
}
