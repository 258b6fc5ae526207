//! Bundled default content.
//!
//! Served whenever the content store is unconfigured, unreachable, or
//! returns a field that fails normalization. Every field the normalizer
//! reads has a value here.

use std::sync::LazyLock;

use super::content::{
    CaseStudy, ContactInfo, HeroContent, ProcessStep, Project, Service, ServicePackage,
    SiteContent, Stat, Testimonial, Work,
};

static FALLBACK: LazyLock<SiteContent> = LazyLock::new(build_fallback);

/// The process-wide default content.
pub fn fallback_content() -> &'static SiteContent {
    &FALLBACK
}

/// Default case study for `slug`, if one is bundled.
pub fn fallback_case_study(slug: &str) -> Option<&'static CaseStudy> {
    FALLBACK.case_study(slug)
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| (*item).to_string()).collect()
}

fn build_fallback() -> SiteContent {
    let projects = vec![
        Project {
            name: "QuestByCycle.org".to_string(),
            summary: "A Flask + Vite PWA with auth, quests, leaderboards, and offline-ready pages for a local climate nonprofit.".to_string(),
            impact: "Ran four public games, onboarded 100+ riders, and earned a $2,000 honorarium.".to_string(),
            stack: strings(&["Flask", "Vite/React", "PostgreSQL", "Redis", "NGINX", "Gunicorn"]),
            link: Some("https://questbycycle.org".to_string()),
            status: Some("Live".to_string()),
        },
        Project {
            name: "Moonshine Art marketplace".to_string(),
            summary: "Flutter + Firebase + Cloud Run poster marketplace with Stripe payments and Terraform-managed GCP.".to_string(),
            impact: "Built monorepo foundations, auth flows, and CI for a remote art founder.".to_string(),
            stack: strings(&["Flutter", "Firebase", "Cloud Run", "Stripe", "Terraform"]),
            link: None,
            status: Some("In progress".to_string()),
        },
        Project {
            name: "CrowdPM Platform".to_string(),
            summary: "React + Vite map UI over a Cloud Run API with deck.gl for a collaborative planning tool.".to_string(),
            impact: "Partnered with capstone teams; delivered MVP specs, architecture docs, and OpenAPI contracts.".to_string(),
            stack: strings(&["React/Vite", "deck.gl", "Firebase", "Cloud Run"]),
            link: None,
            status: Some("In collaboration".to_string()),
        },
    ];

    let service_packages = vec![
        ServicePackage {
            title: "Launch sprint".to_string(),
            summary: "Four to six weeks from scoped idea to a production MVP.".to_string(),
            outcomes: strings(&[
                "A deployed app with auth, admin tooling, and analytics.",
                "Runbooks and a handoff session for your team.",
            ]),
            timeline: Some("4-6 weeks".to_string()),
        },
        ServicePackage {
            title: "Fractional CTO".to_string(),
            summary: "Ongoing technical leadership for founders without an engineering lead.".to_string(),
            outcomes: strings(&[
                "Architecture decisions documented and reviewed.",
                "Hiring, vendor, and roadmap support on a weekly cadence.",
            ]),
            timeline: Some("Monthly retainer".to_string()),
        },
        ServicePackage {
            title: "Platform hardening".to_string(),
            summary: "Make an existing product observable, secure, and cheap to operate.".to_string(),
            outcomes: strings(&[
                "CI/CD, error reporting, and infrastructure as code in place.",
                "A prioritized list of risks with fixes shipped for the top items.",
            ]),
            timeline: Some("2-4 weeks".to_string()),
        },
    ];

    let enrich = |project: &Project,
                  challenge: &str,
                  solution: &str,
                  outcomes: &[&str],
                  package: usize| {
        let mut study = CaseStudy::from_project(project);
        study.challenge = challenge.to_string();
        study.solution = solution.to_string();
        study.outcomes = strings(outcomes);
        study.service_package = service_packages.get(package).cloned();
        study
    };

    let case_studies = vec![
        enrich(
            &projects[0],
            "A volunteer-run nonprofit needed a way to keep riders engaged between events without staff to run it.",
            "Built a gamified PWA with quests, leaderboards, and web push, plus an admin console volunteers can operate.",
            &[
                "Four public games launched.",
                "100+ riders onboarded.",
                "Awarded a $2,000 honorarium.",
            ],
            0,
        ),
        enrich(
            &projects[1],
            "A solo art founder needed a storefront that could grow beyond a no-code prototype.",
            "Set up a monorepo, auth flows, Stripe checkout, and Terraform-managed infrastructure.",
            &["Payments and fulfillment flows in place.", "Repeatable CI for every change."],
            1,
        ),
        enrich(
            &projects[2],
            "Several student teams were building against a moving API with no shared contract.",
            "Wrote the MVP spec, architecture docs, and OpenAPI contracts the teams built against.",
            &["Shared API contract adopted by every team.", "MVP map interface delivered."],
            2,
        ),
    ];

    SiteContent {
        hero: HeroContent {
            eyebrow: "Independent engineering studio".to_string(),
            title: "Fractional CTO + full-stack delivery for founders, nonprofits, and research teams.".to_string(),
            subtitle: "Product framing, architecture, build, and launch of modern web apps, end to end.".to_string(),
            badge: "Cloud Run · Postgres · React/Vite".to_string(),
            primary_cta: "Book a build consult".to_string(),
            secondary_cta: "See recent work".to_string(),
        },
        stats: vec![
            Stat {
                label: "QuestByCycle launches".to_string(),
                value: "4 public games".to_string(),
                helper: Some("100+ riders onboarded with quests, leaderboards, and web push.".to_string()),
            },
            Stat {
                label: "Client honorarium".to_string(),
                value: "$2,000".to_string(),
                helper: Some("Awarded for end-to-end delivery.".to_string()),
            },
            Stat {
                label: "Cloud coverage".to_string(),
                value: "GCP · AWS · Firebase".to_string(),
                helper: Some("Comfortable across hosting, auth, and observability.".to_string()),
            },
        ],
        services: vec![
            Service {
                title: "Product & delivery leadership".to_string(),
                summary: "Turn fuzzy ideas into MVPs and production plans.".to_string(),
                bullets: strings(&[
                    "Specs, data models, and API contracts for multi-team builds.",
                    "Rapid prototypes to validate flows with real stakeholders.",
                    "A steady cadence of weekly milestones, demos, and course-correction.",
                ]),
                badge: Some("Strategy".to_string()),
                link: None,
            },
            Service {
                title: "Full-stack engineering".to_string(),
                summary: "Build and ship resilient, typed apps front-to-back.".to_string(),
                bullets: strings(&[
                    "SPAs, mobile apps, and PWAs with offline support and push.",
                    "Typed APIs on managed containers with Postgres or document stores.",
                    "Authentication, payments, file handling, and accessibility baked in.",
                ]),
                badge: Some("Build".to_string()),
                link: None,
            },
            Service {
                title: "Platform & operations".to_string(),
                summary: "Production readiness from day one.".to_string(),
                bullets: strings(&[
                    "CI/CD with preview environments and trunk-based releases.",
                    "Observability, error reporting, and infrastructure-as-code baselines.",
                    "Secure defaults for authn/z, secrets, and dependency hygiene.",
                ]),
                badge: Some("Reliability".to_string()),
                link: None,
            },
        ],
        differentiators: strings(&[
            "Founder mindset: co-owning outcomes, not just tickets.",
            "Hands-on with Linux servers, TLS, and mail.",
            "Pragmatic stack choices that fit the problem and budget.",
            "Clear artifacts: specs, diagrams, and admin dashboards clients can use.",
        ]),
        projects,
        work: Work {
            case_studies,
            service_packages,
            testimonials: vec![Testimonial {
                quote: "Shipped exactly what our volunteers needed and left us able to run it ourselves.".to_string(),
                person: "Program lead".to_string(),
                role: "Climate nonprofit".to_string(),
                company: None,
                case_study_slug: Some("questbycycle-org".to_string()),
            }],
        },
        process: vec![
            ProcessStep {
                title: "Discover & scope".to_string(),
                detail: "Work sessions to clarify users, success metrics, and constraints.".to_string(),
                outcome: "A lean spec, timeline, and budget owners can sign off on.".to_string(),
            },
            ProcessStep {
                title: "Architecture & plan".to_string(),
                detail: "Choose the stack, data model, and hosting. Diagram auth, observability, and rollout.".to_string(),
                outcome: "An actionable blueprint with tickets, environments, and risks mapped.".to_string(),
            },
            ProcessStep {
                title: "Build & validate".to_string(),
                detail: "Iterative sprints with demos. Tests, accessibility, and analytics wired in.".to_string(),
                outcome: "Working software in staging with real data and admin controls.".to_string(),
            },
            ProcessStep {
                title: "Launch & support".to_string(),
                detail: "Cutover, smoke tests, and training. Handoffs with docs and dashboards.".to_string(),
                outcome: "A reliable system you can operate, and a partner who can extend it.".to_string(),
            },
        ],
        contact: ContactInfo {
            headline: "Ready for a build sprint or technical partner?".to_string(),
            subhead: "Email directly or drop details via the contact form. Replies within one business day.".to_string(),
            email: "hello@example.com".to_string(),
            note: Some("Prefer async? You will get a short plan with scope, risks, and timeline.".to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::domain::slug::is_valid_slug;

    #[test]
    fn case_study_slugs_are_valid_and_unique() {
        let slugs: Vec<&str> = fallback_content()
            .work
            .case_studies
            .iter()
            .map(|item| item.slug.as_str())
            .collect();

        assert_eq!(
            slugs,
            vec!["questbycycle-org", "moonshine-art-marketplace", "crowdpm-platform"]
        );
        assert!(slugs.iter().all(|slug| is_valid_slug(slug)));
        assert_eq!(slugs.iter().collect::<HashSet<_>>().len(), slugs.len());
    }

    #[test]
    fn every_section_is_populated() {
        let content = fallback_content();
        assert!(!content.hero.title.is_empty());
        assert!(!content.stats.is_empty());
        assert!(!content.services.is_empty());
        assert!(!content.differentiators.is_empty());
        assert!(!content.projects.is_empty());
        assert!(!content.work.case_studies.is_empty());
        assert!(!content.work.service_packages.is_empty());
        assert!(!content.work.testimonials.is_empty());
        assert!(!content.process.is_empty());
        assert!(content.contact.note.is_some());
    }

    #[test]
    fn lookup_by_slug() {
        let study = fallback_case_study("crowdpm-platform").expect("bundled study");
        assert_eq!(study.name, "CrowdPM Platform");
        assert!(fallback_case_study("missing").is_none());
    }
}
