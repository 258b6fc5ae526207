//! Site content aggregate and its parts.
//!
//! Field names serialize as camelCase because the same shapes travel over
//! the HTTP API and are stored verbatim as documents. Optional fields are
//! omitted rather than written as `null`.

use serde::{Deserialize, Serialize};

use super::slug::slugify;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SiteContent {
    pub hero: HeroContent,
    pub stats: Vec<Stat>,
    pub services: Vec<Service>,
    pub differentiators: Vec<String>,
    pub projects: Vec<Project>,
    pub work: Work,
    pub process: Vec<ProcessStep>,
    pub contact: ContactInfo,
}

impl SiteContent {
    /// Look up a case study by its slug.
    pub fn case_study(&self, slug: &str) -> Option<&CaseStudy> {
        self.work.case_studies.iter().find(|item| item.slug == slug)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct HeroContent {
    pub eyebrow: String,
    pub title: String,
    pub subtitle: String,
    pub badge: String,
    pub primary_cta: String,
    pub secondary_cta: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Stat {
    pub label: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub helper: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Service {
    pub title: String,
    pub summary: String,
    pub bullets: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// Legacy project card, predating dedicated case studies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Project {
    pub name: String,
    pub summary: String,
    pub impact: String,
    pub stack: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessStep {
    pub title: String,
    pub detail: String,
    pub outcome: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ContactInfo {
    pub headline: String,
    pub subhead: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Work {
    pub case_studies: Vec<CaseStudy>,
    pub service_packages: Vec<ServicePackage>,
    pub testimonials: Vec<Testimonial>,
}

/// A productized engagement. The title doubles as a weak key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ServicePackage {
    pub title: String,
    pub summary: String,
    pub outcomes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeline: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Testimonial {
    pub quote: String,
    pub person: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_study_slug: Option<String>,
}

/// A case study, addressed by a URL-safe slug that is unique within [`Work`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CaseStudy {
    pub slug: String,
    pub name: String,
    pub summary: String,
    pub impact: String,
    pub challenge: String,
    pub solution: String,
    pub outcomes: Vec<String>,
    pub stack: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub live_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_package: Option<ServicePackage>,
}

impl CaseStudy {
    /// Derive a case study from a legacy project card.
    ///
    /// The slug is computed from the project name; challenge and solution
    /// start out as the summary and impact until an editor fills them in.
    pub fn from_project(project: &Project) -> Self {
        Self {
            slug: slugify(&project.name),
            name: project.name.clone(),
            summary: project.summary.clone(),
            impact: project.impact.clone(),
            challenge: project.summary.clone(),
            solution: project.impact.clone(),
            outcomes: Vec::new(),
            stack: project.stack.clone(),
            status: project.status.clone(),
            live_url: project.link.clone(),
            repository_url: None,
            service_package: None,
        }
    }
}
