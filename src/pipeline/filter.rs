//! Heuristic job-relevance screening over email text.
//!
//! Exclusion rules always win over inclusion rules. A message that matches
//! neither may still be kept by the ambiguous-context rule, which looks for
//! application language next to a hiring word without financial or housing
//! vocabulary.

use once_cell::sync::Lazy;
use regex::Regex;

struct Rule {
    label: &'static str,
    pattern: Regex,
}

fn rules(specs: &[(&'static str, &str)]) -> Vec<Rule> {
    specs
        .iter()
        .map(|&(label, pattern)| Rule {
            label,
            pattern: Regex::new(pattern).expect("valid regex"),
        })
        .collect()
}

static EXCLUSIONS: Lazy<Vec<Rule>> = Lazy::new(|| {
    rules(&[
        (
            "housing",
            r"\b(lease agreement|lease renewal|your lease|leasing office|rental application|apartment application|tenant portal|move-in date)\b",
        ),
        (
            "account_security",
            r"(reset your password|password reset|verify your email|verification code|one-time passcode|security code)",
        ),
        (
            "job_alert_digest",
            r"(job alert|jobs you may be interested in|recommended jobs|new jobs for you|jobs matching your|jobs based on your|daily digest|weekly digest)",
        ),
        (
            "issue_tracker",
            r"(\[[\w.-]+/[\w.-]+\]|\bpull request\b|\bopened an issue\b|\bcommented on (this|the) issue\b|\bmerged #\d+|\bjira\b)",
        ),
        (
            "retail",
            r"\b(your order|order confirmation|has shipped|shipping confirmation|tracking number|payment receipt)\b",
        ),
    ])
});

static INCLUSIONS: Lazy<Vec<Rule>> = Lazy::new(|| {
    rules(&[
        (
            "application_confirmation",
            r"(thanks? (you )?for (applying|your application|your interest in)|we (have )?received your application|application (has been )?(received|submitted)|your application (to|for|with))",
        ),
        (
            "interview_scheduling",
            r"(interview (invitation|request|scheduled|confirmation)|schedule (an|your|a) (interview|call|chat)|invite you to (an? )?interview|phone screen|availability for (an? )?interview)",
        ),
        (
            "next_steps",
            r"(\bnext steps?\b|move forward with your (application|candidacy))",
        ),
        (
            "offer",
            r"(offer letter|pleased to offer|extend (you )?an offer|job offer|offer of employment)",
        ),
        (
            "rejection",
            r"(regret to inform|(will|have decided to) not (be )?mov(e|ing) forward|decided to (move|proceed) forward with other candidates|pursue other candidates|position has been filled|not (been )?selected for)",
        ),
        (
            "assessment",
            r"(coding (challenge|assessment)|online assessment|technical assessment|take-home|hackerrank|codility|codesignal)",
        ),
        (
            "background_check",
            r"(background check|background screening|reference check)",
        ),
        (
            "status_update",
            r"(application status|status of your application|update on your application|regarding your application)",
        ),
        (
            "advancement",
            r"(advance to the next (round|stage)|advanced to the next|selected for (the )?next (round|stage)|shortlisted)",
        ),
        ("internship", r"\b(internship|intern position|co-op)\b"),
        (
            "offer_acceptance",
            r"(offer acceptance|accepted (the|your) offer|welcome to the team|welcome aboard)",
        ),
    ])
});

static APPLICATION_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(application|applied)\b").expect("valid regex"));
static HIRING_WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(position|role|opportunity|candidacy|hiring)\b").expect("valid regex")
});
static FINANCE_OR_HOUSING_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(lease|rental|credit|loan)\b").expect("valid regex"));

/// Outcome of the subject-only pre-check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectVerdict {
    /// An exclusion rule matched; the body is not worth decoding.
    Excluded,
    Relevant,
    Undecided,
}

pub fn is_job_related(subject: &str, body: &str) -> bool {
    matched_label(subject, body).is_some()
}

/// Name of the rule that made the text relevant, or `None` when it is not.
pub fn matched_label(subject: &str, body: &str) -> Option<&'static str> {
    classify(&normalize(&format!("{subject}\n{body}")))
}

pub fn screen_subject(subject: &str) -> SubjectVerdict {
    let text = normalize(subject);
    if excluded(&text) {
        return SubjectVerdict::Excluded;
    }
    match classify(&text) {
        Some(_) => SubjectVerdict::Relevant,
        None => SubjectVerdict::Undecided,
    }
}

/// Lowercased, with every whitespace run folded to one space so phrases split
/// across lines or markup still match.
fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn excluded(text: &str) -> bool {
    EXCLUSIONS.iter().any(|rule| rule.pattern.is_match(text))
}

fn classify(text: &str) -> Option<&'static str> {
    if excluded(text) {
        return None;
    }
    if let Some(rule) = INCLUSIONS.iter().find(|rule| rule.pattern.is_match(text)) {
        return Some(rule.label);
    }
    let ambiguous = APPLICATION_WORD.is_match(text)
        && HIRING_WORD.is_match(text)
        && !FINANCE_OR_HOUSING_WORD.is_match(text);
    ambiguous.then_some("ambiguous_context")
}
