//! Coercion of untrusted documents into well-typed content.
//!
//! Remote documents are duck-typed JSON. Nothing here fails: every reader
//! either accepts a value or substitutes a fallback, field by field.
//! A string is accepted only when it is non-blank after trimming; a list of
//! strings only when at least one such string survives.

use serde_json::{Map, Value};

use super::content::{
    CaseStudy, ContactInfo, HeroContent, ProcessStep, Project, Service, ServicePackage, Stat,
    Testimonial,
};
use super::fallback::{fallback_case_study, fallback_content};
use super::slug::{SlugAssigner, slugify};

/// Outcome of validating one untrusted value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized<T> {
    Valid(T),
    UseFallback,
}

impl<T> Normalized<T> {
    pub fn or_else(self, fallback: impl FnOnce() -> T) -> T {
        match self {
            Self::Valid(value) => value,
            Self::UseFallback => fallback(),
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Valid(value) => Some(value),
            Self::UseFallback => None,
        }
    }
}

/// Validate a non-blank string, trimmed.
pub fn text(value: Option<&Value>) -> Normalized<String> {
    match value.and_then(Value::as_str).map(str::trim) {
        Some(trimmed) if !trimmed.is_empty() => Normalized::Valid(trimmed.to_string()),
        _ => Normalized::UseFallback,
    }
}

/// Validate an array of strings, keeping only non-blank entries.
///
/// An array with nothing left after filtering is treated like a missing
/// value so that an accidental empty list cannot blank a section.
pub fn string_list(value: Option<&Value>) -> Normalized<Vec<String>> {
    let Some(items) = value.and_then(Value::as_array) else {
        return Normalized::UseFallback;
    };

    let kept: Vec<String> = items
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect();

    if kept.is_empty() {
        Normalized::UseFallback
    } else {
        Normalized::Valid(kept)
    }
}

pub fn text_or(value: Option<&Value>, fallback: &str) -> String {
    text(value).or_else(|| fallback.to_string())
}

pub fn optional_text(value: Option<&Value>, fallback: Option<&String>) -> Option<String> {
    text(value).into_option().or_else(|| fallback.cloned())
}

pub fn string_list_or(value: Option<&Value>, fallback: &[String]) -> Vec<String> {
    string_list(value).or_else(|| fallback.to_vec())
}

fn object(value: Option<&Value>) -> Option<&Map<String, Value>> {
    value.and_then(Value::as_object)
}

/// Normalize a list of records against a fallback list.
///
/// Each element is matched to a fallback record by its key field, or by
/// position when the element carries no key. Elements that cannot be
/// normalized are dropped; if nothing survives, the fallback list is used.
fn record_list<T: Clone>(
    value: Option<&Value>,
    fallback: &[T],
    key_field: &str,
    key_of: fn(&T) -> &str,
    normalize: fn(&Value, Option<&T>) -> Option<T>,
) -> Vec<T> {
    let Some(items) = value.and_then(Value::as_array) else {
        return fallback.to_vec();
    };

    let normalized: Vec<T> = items
        .iter()
        .enumerate()
        .filter(|(_, item)| item.is_object())
        .filter_map(|(index, item)| {
            let matched = match text(item.get(key_field)) {
                Normalized::Valid(key) => fallback.iter().find(|candidate| key_of(candidate) == key),
                Normalized::UseFallback => fallback.get(index),
            };
            normalize(item, matched)
        })
        .collect();

    if normalized.is_empty() {
        fallback.to_vec()
    } else {
        normalized
    }
}

pub fn hero(value: Option<&Value>, fallback: &HeroContent) -> HeroContent {
    let record = object(value);
    let field = |name: &str| record.and_then(|map| map.get(name));

    HeroContent {
        eyebrow: text_or(field("eyebrow"), &fallback.eyebrow),
        title: text_or(field("title"), &fallback.title),
        subtitle: text_or(field("subtitle"), &fallback.subtitle),
        badge: text_or(field("badge"), &fallback.badge),
        primary_cta: text_or(field("primaryCta"), &fallback.primary_cta),
        secondary_cta: text_or(field("secondaryCta"), &fallback.secondary_cta),
    }
}

pub fn contact(value: Option<&Value>, fallback: &ContactInfo) -> ContactInfo {
    let record = object(value);
    let field = |name: &str| record.and_then(|map| map.get(name));

    ContactInfo {
        headline: text_or(field("headline"), &fallback.headline),
        subhead: text_or(field("subhead"), &fallback.subhead),
        email: text_or(field("email"), &fallback.email),
        note: optional_text(field("note"), fallback.note.as_ref()),
    }
}

pub fn stat(value: &Value, fallback: Option<&Stat>) -> Option<Stat> {
    let label = text(value.get("label"))
        .into_option()
        .or_else(|| fallback.map(|item| item.label.clone()))?;

    Some(Stat {
        label,
        value: text_or(value.get("value"), fallback.map(|item| item.value.as_str()).unwrap_or_default()),
        helper: optional_text(value.get("helper"), fallback.and_then(|item| item.helper.as_ref())),
    })
}

pub fn service(value: &Value, fallback: Option<&Service>) -> Option<Service> {
    let title = text(value.get("title"))
        .into_option()
        .or_else(|| fallback.map(|item| item.title.clone()))?;

    Some(Service {
        title,
        summary: text_or(value.get("summary"), fallback.map(|item| item.summary.as_str()).unwrap_or_default()),
        bullets: string_list_or(
            value.get("bullets"),
            fallback.map(|item| item.bullets.as_slice()).unwrap_or_default(),
        ),
        badge: optional_text(value.get("badge"), fallback.and_then(|item| item.badge.as_ref())),
        link: optional_text(value.get("link"), fallback.and_then(|item| item.link.as_ref())),
    })
}

pub fn project(value: &Value, fallback: Option<&Project>) -> Option<Project> {
    let name = text(value.get("name"))
        .into_option()
        .or_else(|| fallback.map(|item| item.name.clone()))?;
    let summary = text_or(value.get("summary"), fallback.map(|item| item.summary.as_str()).unwrap_or_default());

    Some(Project {
        name,
        impact: text(value.get("impact"))
            .into_option()
            .or_else(|| fallback.map(|item| item.impact.clone()))
            .unwrap_or_else(|| summary.clone()),
        summary,
        stack: string_list_or(
            value.get("stack"),
            fallback.map(|item| item.stack.as_slice()).unwrap_or_default(),
        ),
        link: optional_text(value.get("link"), fallback.and_then(|item| item.link.as_ref())),
        status: optional_text(value.get("status"), fallback.and_then(|item| item.status.as_ref())),
    })
}

pub fn process_step(value: &Value, fallback: Option<&ProcessStep>) -> Option<ProcessStep> {
    let title = text(value.get("title"))
        .into_option()
        .or_else(|| fallback.map(|item| item.title.clone()))?;

    Some(ProcessStep {
        title,
        detail: text_or(value.get("detail"), fallback.map(|item| item.detail.as_str()).unwrap_or_default()),
        outcome: text_or(value.get("outcome"), fallback.map(|item| item.outcome.as_str()).unwrap_or_default()),
    })
}

/// Normalize a service package. A missing or untitled record resolves to
/// the fallback package, which may itself be absent.
pub fn service_package(
    value: Option<&Value>,
    fallback: Option<&ServicePackage>,
) -> Option<ServicePackage> {
    let Some(record) = object(value) else {
        return fallback.cloned();
    };

    let Some(title) = text(record.get("title"))
        .into_option()
        .or_else(|| fallback.map(|item| item.title.clone()))
    else {
        return fallback.cloned();
    };

    Some(ServicePackage {
        title,
        summary: text_or(record.get("summary"), fallback.map(|item| item.summary.as_str()).unwrap_or_default()),
        outcomes: string_list_or(
            record.get("outcomes"),
            fallback.map(|item| item.outcomes.as_slice()).unwrap_or_default(),
        ),
        timeline: optional_text(
            record.get("timeline"),
            fallback.and_then(|item| item.timeline.as_ref()),
        ),
    })
}

/// A testimonial needs a quote, a person and a role; anything less is dropped.
pub fn testimonial(value: &Value) -> Option<Testimonial> {
    Some(Testimonial {
        quote: text(value.get("quote")).into_option()?,
        person: text(value.get("person")).into_option()?,
        role: text(value.get("role")).into_option()?,
        company: text(value.get("company")).into_option(),
        case_study_slug: text(value.get("caseStudySlug")).into_option(),
    })
}

/// Normalize a case study record.
///
/// Missing fields come from the bundled case study with the same slug.
/// `slug_hint` names the slug when the record is keyed externally, as
/// subcollection documents are. Records without a resolvable name are
/// dropped.
pub fn case_study(value: &Value, slug_hint: Option<&str>) -> Option<CaseStudy> {
    let record = value.as_object()?;
    let field = |name: &str| record.get(name);

    let resolved_slug = text(field("slug"))
        .into_option()
        .or_else(|| slug_hint.map(str::to_string));
    let fallback = resolved_slug.as_deref().and_then(fallback_case_study);

    let name = text(field("name"))
        .into_option()
        .or_else(|| fallback.map(|item| item.name.clone()))?;

    let slug = resolved_slug.unwrap_or_else(|| slugify(&name));
    let summary = text_or(field("summary"), fallback.map(|item| item.summary.as_str()).unwrap_or_default());
    let impact = text(field("impact"))
        .into_option()
        .or_else(|| fallback.map(|item| item.impact.clone()))
        .unwrap_or_else(|| summary.clone());
    let challenge = text(field("challenge"))
        .into_option()
        .or_else(|| fallback.map(|item| item.challenge.clone()))
        .unwrap_or_else(|| summary.clone());
    let solution = text(field("solution"))
        .into_option()
        .or_else(|| fallback.map(|item| item.solution.clone()))
        .unwrap_or_else(|| impact.clone());

    Some(CaseStudy {
        slug,
        name,
        summary,
        impact,
        challenge,
        solution,
        outcomes: string_list_or(
            field("outcomes"),
            fallback.map(|item| item.outcomes.as_slice()).unwrap_or_default(),
        ),
        stack: string_list_or(
            field("stack"),
            fallback.map(|item| item.stack.as_slice()).unwrap_or_default(),
        ),
        status: optional_text(field("status"), fallback.and_then(|item| item.status.as_ref())),
        live_url: optional_text(
            field("liveUrl"),
            fallback.and_then(|item| item.live_url.as_ref()),
        ),
        repository_url: optional_text(
            field("repositoryUrl"),
            fallback.and_then(|item| item.repository_url.as_ref()),
        ),
        service_package: service_package(
            field("servicePackage"),
            fallback.and_then(|item| item.service_package.as_ref()),
        ),
    })
}

/// Normalize a subcollection document; the document key is its slug.
pub fn case_study_document(key: &str, data: &Value) -> Option<CaseStudy> {
    let mut record = data.as_object()?.clone();
    record.insert("slug".to_string(), Value::String(key.to_string()));
    case_study(&Value::Object(record), Some(key))
}

/// Case studies embedded in the root document (`work.caseStudies`).
pub fn embedded_case_studies(value: Option<&Value>) -> Vec<CaseStudy> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(|item| case_study(item, None)).collect())
        .unwrap_or_default()
}

const UNTITLED_CASE_STUDY: &str = "Untitled case study";

fn trimmed(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn trimmed_list(items: &[String]) -> Vec<String> {
    items.iter().filter_map(|item| trimmed(item)).collect()
}

fn trimmed_option(value: Option<&String>) -> Option<String> {
    value.and_then(|item| trimmed(item))
}

/// Prepare an editor draft of case studies for persistence.
///
/// Slugs are assigned in draft order and are unique within the result.
/// Text is trimmed without consulting bundled content, so an editor can
/// clear a list or drop a service package.
pub fn case_studies_for_save(drafts: &[CaseStudy]) -> Vec<CaseStudy> {
    let mut assigner = SlugAssigner::new();

    drafts
        .iter()
        .enumerate()
        .map(|(position, draft)| {
            let slug = assigner.assign(Some(&draft.slug), &draft.name, position);
            let summary = trimmed(&draft.summary).unwrap_or_default();
            let impact = trimmed(&draft.impact).unwrap_or_default();

            CaseStudy {
                slug,
                name: trimmed(&draft.name).unwrap_or_else(|| UNTITLED_CASE_STUDY.to_string()),
                challenge: trimmed(&draft.challenge).unwrap_or_else(|| summary.clone()),
                solution: trimmed(&draft.solution).unwrap_or_else(|| impact.clone()),
                summary,
                impact,
                outcomes: trimmed_list(&draft.outcomes),
                stack: trimmed_list(&draft.stack),
                status: trimmed_option(draft.status.as_ref()),
                live_url: trimmed_option(draft.live_url.as_ref()),
                repository_url: trimmed_option(draft.repository_url.as_ref()),
                service_package: draft.service_package.as_ref().and_then(|package| {
                    Some(ServicePackage {
                        title: trimmed(&package.title)?,
                        summary: trimmed(&package.summary).unwrap_or_default(),
                        outcomes: trimmed_list(&package.outcomes),
                        timeline: trimmed_option(package.timeline.as_ref()),
                    })
                }),
            }
        })
        .collect()
}

pub fn stats(value: Option<&Value>) -> Vec<Stat> {
    record_list(value, &fallback_content().stats, "label", |item| &item.label, stat)
}

pub fn services(value: Option<&Value>) -> Vec<Service> {
    record_list(value, &fallback_content().services, "title", |item| &item.title, service)
}

pub fn projects(value: Option<&Value>) -> Vec<Project> {
    record_list(value, &fallback_content().projects, "name", |item| &item.name, project)
}

pub fn process(value: Option<&Value>) -> Vec<ProcessStep> {
    record_list(value, &fallback_content().process, "title", |item| &item.title, process_step)
}

pub fn service_packages(value: Option<&Value>) -> Vec<ServicePackage> {
    record_list(
        value,
        &fallback_content().work.service_packages,
        "title",
        |item| &item.title,
        |item, fallback| service_package(Some(item), fallback),
    )
}

/// Testimonials are optional: an array that normalizes to nothing stays empty.
pub fn testimonials(value: Option<&Value>) -> Vec<Testimonial> {
    match value.and_then(Value::as_array) {
        Some(items) => items.iter().filter_map(testimonial).collect(),
        None => fallback_content().work.testimonials.clone(),
    }
}

pub fn differentiators(value: Option<&Value>) -> Vec<String> {
    string_list_or(value, &fallback_content().differentiators)
}

/// Remove explicitly absent (`null`) members and elements, recursively.
///
/// The document store rejects payloads carrying absent markers; empty
/// strings and empty lists are kept.
pub fn strip_absent(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .filter(|item| !item.is_null())
                .map(strip_absent)
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, entry)| !entry.is_null())
                .map(|(key, entry)| (key, strip_absent(entry)))
                .collect(),
        ),
        other => other,
    }
}
