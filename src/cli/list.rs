//! List command

use std::collections::BTreeMap;

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use once_cell::sync::Lazy;
use serde_json::Value;
use tracing::debug;

use crate::api::cache::Memo;
use crate::api::dispatch::{self, AnyObject};
use crate::api::{ApiClient, ConfigService};
use crate::config::Config;
use crate::model::{Domain, DomainKey, ObjectKind, Zone, ZoneKey};
use crate::output;

/// Attributes listed with `--show-filter-fields` may be given as
/// `name=value` arguments. Slice attributes take a list joined by
/// `--filter-slice-separator`, time attributes milliseconds since the Unix
/// epoch, and boolean attributes any of true, t, yes, y or 1 (any case).
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Object type
    #[arg(value_enum)]
    pub kind: ObjectKind,

    /// Filter attributes, as name=value
    pub attrs: Vec<String>,

    /// Show the attributes results can be filtered by
    #[arg(long)]
    pub show_filter_fields: bool,

    /// Separator between elements of a slice filter attribute
    #[arg(long, default_value = ",")]
    pub filter_slice_separator: String,

    /// Predefined template name (cluster: summary; shared_rules: summary;
    /// route: summary, path-only; user: summary) or +<custom>, where
    /// {field} is replaced by the record attribute and \t separates columns
    #[arg(short, long)]
    pub template: Option<String>,

    /// Header row for a custom template
    #[arg(long)]
    pub header: Option<String>,
}

struct Predefined {
    header: &'static str,
    body: &'static str,
}

static TEMPLATES: Lazy<BTreeMap<ObjectKind, BTreeMap<&'static str, Predefined>>> =
    Lazy::new(|| {
        let mut all = BTreeMap::new();
        all.insert(
            ObjectKind::Cluster,
            BTreeMap::from([(
                "summary",
                Predefined {
                    header: "Cluster Key\tInstances\tZone\tName",
                    body: "{cluster_key}\t{instances.len}\t{zone}\t{name}",
                },
            )]),
        );
        all.insert(
            ObjectKind::SharedRules,
            BTreeMap::from([(
                "summary",
                Predefined {
                    header: "SharedRulesKey\tZone\tName",
                    body: "{shared_rules_key}\t{zone}\t{name}",
                },
            )]),
        );
        all.insert(
            ObjectKind::Route,
            BTreeMap::from([
                (
                    "summary",
                    Predefined {
                        header: "Route Key\tPath\tName:port\tZone",
                        body: "{route_key}\t{path}\t{domain}\t{zone}",
                    },
                ),
                (
                    "path-only",
                    Predefined {
                        header: "Route Key\tPath",
                        body: "{route_key}\t{path}",
                    },
                ),
            ]),
        );
        all.insert(
            ObjectKind::User,
            BTreeMap::from([(
                "summary",
                Predefined {
                    header: "User Key\tEmail",
                    body: "{user_key}\t{login_email}",
                },
            )]),
        );
        all
    });

pub async fn execute(config: &Config, args: ListArgs) -> Result<()> {
    if args.show_filter_fields {
        show_filter_fields(args.kind);
        return Ok(());
    }

    // Resolve the template before any request so a bad name fails fast
    let template = match args.template.as_deref() {
        Some(t) => Some(resolve_template(args.kind, t, args.header.as_deref())?),
        None => None,
    };

    let client = ApiClient::new(config.clone())?;
    let attrs = parse_attrs(&args.attrs);
    let objects = dispatch::index(&client, args.kind, &attrs, &args.filter_slice_separator)
        .await
        .with_context(|| format!("Unable to list {}", args.kind))?;

    match template {
        None => output::print_output(&objects, config.output_format)?,
        Some((header, template)) => {
            let rows = Renderer::new(&client).render_all(&template, &objects).await?;
            output::table(header.as_deref(), &rows);
        }
    }

    Ok(())
}

fn show_filter_fields(kind: ObjectKind) {
    println!(
        "Listing results may be filtered by setting attributes of a {}",
        dispatch::filter_name(kind)
    );
    println!("\nThe filterable attribute names and their types:");

    let fields = dispatch::describe_filter(kind);
    output::field_table(fields.iter().map(|(name, label)| (*name, label.as_str())));
}

/// Split `name=value` arguments on the first `=`; a bare name has an empty
/// value
fn parse_attrs(args: &[String]) -> BTreeMap<String, String> {
    args.iter()
        .map(|kv| match kv.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (kv.to_string(), String::new()),
        })
        .collect()
}

/// Header and parsed template for a predefined name or a `+custom` string
fn resolve_template(
    kind: ObjectKind,
    name: &str,
    custom_header: Option<&str>,
) -> Result<(Option<String>, Template)> {
    if let Some(custom) = name.strip_prefix('+') {
        let header = custom_header.map(unescape);
        return Ok((header, Template::parse(&unescape(custom))?));
    }

    let predefined = TEMPLATES.get(&kind).and_then(|t| t.get(name)).ok_or_else(|| {
        anyhow!(
            "No available templates for object '{}' by name of '{}'",
            kind,
            name
        )
    })?;

    Ok((
        Some(predefined.header.to_string()),
        Template::parse(predefined.body)?,
    ))
}

fn unescape(s: &str) -> String {
    s.replace("\\t", "\t").replace("\\n", "\n")
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Text(String),
    Field(String),
}

#[derive(Debug, Clone, PartialEq)]
struct Template(Vec<Segment>);

impl Template {
    fn parse(source: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut rest = source;

        while let Some(open) = rest.find('{') {
            if open > 0 {
                segments.push(Segment::Text(rest[..open].to_string()));
            }
            let after = &rest[open + 1..];
            let close = after
                .find('}')
                .ok_or_else(|| anyhow!("failed to parse template {:?}: unclosed '{{'", source))?;
            let field = after[..close].trim();
            if field.is_empty() {
                bail!("failed to parse template {:?}: empty field", source);
            }
            segments.push(Segment::Field(field.to_string()));
            rest = &after[close + 1..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }

        Ok(Self(segments))
    }
}

/// Fills templates, fetching referenced zones and domains once per command
struct Renderer<'a, S> {
    svc: &'a S,
    zones: Memo<Zone>,
    domains: Memo<Domain>,
}

impl<'a, S: ConfigService> Renderer<'a, S> {
    fn new(svc: &'a S) -> Self {
        Self {
            svc,
            zones: Memo::new(),
            domains: Memo::new(),
        }
    }

    async fn render_all(
        &mut self,
        template: &Template,
        objects: &[AnyObject],
    ) -> Result<Vec<String>> {
        let mut rows = Vec::with_capacity(objects.len());
        for object in objects {
            rows.push(self.render(template, object).await?);
        }
        debug!(
            "template lookups: {} zones, {} domains",
            self.zones.len(),
            self.domains.len()
        );
        Ok(rows)
    }

    async fn render(&mut self, template: &Template, object: &AnyObject) -> Result<String> {
        let value = object.to_value()?;
        let mut out = String::new();

        for segment in &template.0 {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Field(field) => out.push_str(&self.field(&value, field).await?),
            }
        }

        Ok(out)
    }

    async fn field(&mut self, value: &Value, field: &str) -> Result<String> {
        match field {
            "zone" => {
                let key = ZoneKey::from(str_attr(value, "zone_key"));
                if key.is_empty() {
                    return Ok(String::new());
                }
                Ok(self.zones.get(self.svc, &key).await?.name.clone())
            }
            "domain" => {
                let key = DomainKey::from(str_attr(value, "domain_key"));
                if key.is_empty() {
                    return Ok(String::new());
                }
                Ok(self.domains.get(self.svc, &key).await?.addr())
            }
            path => Ok(lookup(value, path).map(display).unwrap_or_default()),
        }
    }
}

fn str_attr(value: &Value, name: &str) -> String {
    value
        .get(name)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Follow a dotted path; `len` of an array or object is its size
fn lookup(value: &Value, path: &str) -> Option<Value> {
    let mut current = value.clone();
    for part in path.split('.') {
        current = match (&current, part) {
            (Value::Array(items), "len") => Value::from(items.len()),
            (Value::Object(map), "len") if !map.contains_key("len") => Value::from(map.len()),
            (Value::Array(items), idx) => items.get(idx.parse::<usize>().ok()?)?.clone(),
            (Value::Object(map), name) => map.get(name)?.clone(),
            _ => return None,
        };
    }
    Some(current)
}

fn display(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}
