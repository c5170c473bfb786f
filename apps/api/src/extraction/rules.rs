//! Rule-based extraction: finds section headers case-insensitively and
//! attributes the following lines to that section until the next header.
//!
//! Lines before the first header (name, contact details) are ignored.
//! Text without any recognizable header yields empty fields.

use async_trait::async_trait;
use tracing::debug;

use crate::errors::AppError;
use crate::extraction::{ExtractedFields, FieldExtractor};
use crate::profile::models::{EducationEntry, ExperienceEntry, SkillSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Summary,
    Skills,
    Education,
    Experience,
    /// A known header whose content is not extracted (projects, awards...).
    Other,
}

const SECTION_HEADERS: &[(Section, &[&str])] = &[
    (
        Section::Summary,
        &[
            "summary",
            "professional summary",
            "profile",
            "professional profile",
            "about",
            "about me",
            "objective",
            "career objective",
        ],
    ),
    (
        Section::Skills,
        &[
            "skills",
            "technical skills",
            "key skills",
            "core skills",
            "core competencies",
            "competencies",
            "technologies",
            "tech stack",
            "tools",
            "skills & tools",
            "skills and tools",
        ],
    ),
    (
        Section::Education,
        &[
            "education",
            "academic background",
            "academics",
            "education & training",
            "education and training",
            "qualifications",
        ],
    ),
    (
        Section::Experience,
        &[
            "experience",
            "work experience",
            "professional experience",
            "relevant experience",
            "employment",
            "employment history",
            "work history",
            "career history",
        ],
    ),
    (
        Section::Other,
        &[
            "projects",
            "personal projects",
            "certifications",
            "certificates",
            "awards",
            "honors",
            "publications",
            "interests",
            "hobbies",
            "languages",
            "references",
            "achievements",
            "volunteering",
            "volunteer experience",
            "activities",
            "contact",
        ],
    ),
];

const BULLETS: &[char] = &['-', '*', '•', '·', '●', '▪', '◦', '–', '—', '>'];
const SKILL_SEPARATORS: &[char] = &[',', ';', '|', '•', '·', '●', '▪'];
/// Longer than this, a "skill" is a sentence.
const MAX_SKILL_WORDS: usize = 4;
const MAX_HEADER_WORDS: usize = 14;

const SHORT_DEGREES: &[&str] = &[
    "bs", "bsc", "ba", "bba", "ma", "ms", "msc", "mba", "phd", "btech", "mtech", "beng", "meng",
    "llb", "llm", "md", "jd", "ged",
];
const DEGREE_MARKERS: &[&str] = &[
    "bachelor",
    "master",
    "doctor",
    "associate",
    "diploma",
    "degree",
    "certificate",
];
const INSTITUTION_MARKERS: &[&str] = &[
    "university",
    "college",
    "institute",
    "school",
    "academy",
    "polytechnic",
    "universidad",
    "université",
];
const MONTHS: &[&str] = &[
    "jan", "january", "feb", "february", "mar", "march", "apr", "april", "may", "jun", "june",
    "jul", "july", "aug", "august", "sep", "sept", "september", "oct", "october", "nov",
    "november", "dec", "december",
];
const DATE_WORDS: &[&str] = &["present", "current", "now", "to", "since", "expected", "today"];

/// Deterministic header-driven extractor.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleBasedExtractor;

#[async_trait]
impl FieldExtractor for RuleBasedExtractor {
    fn name(&self) -> &'static str {
        "rules"
    }

    async fn extract(&self, raw_text: &str) -> Result<ExtractedFields, AppError> {
        Ok(extract_fields(raw_text))
    }
}

#[derive(Default)]
struct SectionLines<'a> {
    summary: Vec<&'a str>,
    skills: Vec<&'a str>,
    education: Vec<&'a str>,
    experience: Vec<&'a str>,
}

impl<'a> SectionLines<'a> {
    fn push(&mut self, section: Section, line: &'a str) {
        match section {
            Section::Summary => self.summary.push(line),
            Section::Skills => self.skills.push(line),
            Section::Education => self.education.push(line),
            Section::Experience => self.experience.push(line),
            Section::Other => {}
        }
    }
}

pub fn extract_fields(raw_text: &str) -> ExtractedFields {
    let sections = split_sections(raw_text);

    let fields = ExtractedFields {
        skills: parse_skills(&sections.skills),
        education: parse_education(&sections.education),
        experience: parse_experience(&sections.experience),
        bio: parse_bio(&sections.summary),
    };

    debug!(
        "Rule-based extraction: {} skills, {} education, {} experience, bio {} chars",
        fields.skills.len(),
        fields.education.len(),
        fields.experience.len(),
        fields.bio.len()
    );
    fields
}

fn split_sections(raw_text: &str) -> SectionLines<'_> {
    let mut sections = SectionLines::default();
    let mut current: Option<Section> = None;

    for line in raw_text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if strip_bullet(line).0 {
            if let Some(section) = current {
                sections.push(section, line);
            }
            continue;
        }

        if let Some((section, inline)) = detect_header(line) {
            current = Some(section);
            if let Some(rest) = inline {
                sections.push(section, rest);
            }
            continue;
        }

        if let Some(section) = current {
            sections.push(section, line);
        }
    }

    sections
}

/// Recognizes `Education`, `## WORK EXPERIENCE`, or inline `Skills: a, b`.
fn detect_header(line: &str) -> Option<(Section, Option<&str>)> {
    if let Some((head, rest)) = line.split_once(':') {
        let rest = rest.trim();
        if let Some(section) = lookup_header(head) {
            if rest.is_empty() {
                return Some((section, None));
            }
            // "Languages: English, French" inside a skills list is content.
            if section != Section::Other {
                return Some((section, Some(rest)));
            }
            return None;
        }
    }
    lookup_header(line).map(|section| (section, None))
}

fn lookup_header(text: &str) -> Option<Section> {
    let key = canonical_header(text);
    if key.is_empty() {
        return None;
    }
    SECTION_HEADERS
        .iter()
        .find(|(_, aliases)| aliases.contains(&key.as_str()))
        .map(|(section, _)| *section)
}

fn canonical_header(text: &str) -> String {
    text.trim_matches(|c: char| !c.is_alphanumeric())
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Returns whether the line was a bullet, and the text after the marker.
fn strip_bullet(line: &str) -> (bool, &str) {
    let trimmed = line.trim_start();
    match trimmed.chars().next() {
        Some(c) if BULLETS.contains(&c) => {
            (true, trimmed.trim_start_matches(BULLETS).trim())
        }
        _ => (false, trimmed.trim()),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Summary and skills
// ────────────────────────────────────────────────────────────────────────────

fn parse_bio(lines: &[&str]) -> String {
    lines
        .iter()
        .map(|l| strip_bullet(l).1)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_skills(lines: &[&str]) -> SkillSet {
    let mut skills = SkillSet::new();
    for line in lines {
        let text = strip_bullet(line).1;
        // Drop sub-labels such as "Languages:" or "Cloud:"
        let text = text.rsplit_once(':').map(|(_, rest)| rest).unwrap_or(text);

        for item in text.split(SKILL_SEPARATORS) {
            let item = item.trim().trim_end_matches('.').trim();
            if item.is_empty() || item.split_whitespace().count() > MAX_SKILL_WORDS {
                continue;
            }
            skills.insert(item);
        }
    }
    skills
}

// ────────────────────────────────────────────────────────────────────────────
// Education
// ────────────────────────────────────────────────────────────────────────────

fn parse_education(lines: &[&str]) -> Vec<EducationEntry> {
    let mut entries = Vec::new();
    let mut current: Option<EducationEntry> = None;

    for line in lines {
        let text = strip_bullet(line).1;
        let year = find_years(text).pop();

        let mut degree: Option<String> = None;
        let mut institution: Option<String> = None;
        let mut unclassified: Vec<String> = Vec::new();
        for part in split_parts(text) {
            if is_date_like(&part) {
                continue;
            }
            let has_degree = mentions_degree(&part);
            let has_institution = mentions_institution(&part);
            match (has_degree, has_institution) {
                (true, false) if degree.is_none() => degree = Some(part),
                (false, true) if institution.is_none() => institution = Some(part),
                (true, true) if degree.is_none() => degree = Some(part),
                (true, true) if institution.is_none() => institution = Some(part),
                _ => unclassified.push(part),
            }
        }

        // "MIT, PhD Physics": the leftover part fills the missing half.
        let mut leftovers = unclassified.into_iter();
        if degree.is_some() && institution.is_none() {
            institution = leftovers.next();
        } else if degree.is_none() && institution.is_some() {
            degree = leftovers.next();
        }

        if degree.is_none() && institution.is_none() {
            // Continuation line (dates, GPA, coursework): only a year is kept.
            if let (Some(entry), Some(year)) = (current.as_mut(), year) {
                entry.year.get_or_insert(year);
            }
            continue;
        }

        if let Some(entry) = current.as_mut() {
            let completes_degree =
                degree.is_some() && institution.is_none() && entry.degree.is_empty();
            let completes_institution =
                institution.is_some() && degree.is_none() && entry.institution.is_empty();
            if completes_degree || completes_institution {
                if let Some(d) = degree {
                    entry.degree = d;
                }
                if let Some(i) = institution {
                    entry.institution = i;
                }
                if let Some(y) = year {
                    entry.year.get_or_insert(y);
                }
                continue;
            }
        }

        if let Some(done) = current.take() {
            entries.push(done);
        }
        current = Some(EducationEntry {
            degree: degree.unwrap_or_default(),
            institution: institution.unwrap_or_default(),
            year,
        });
    }

    entries.extend(current);
    entries
}

fn mentions_degree(part: &str) -> bool {
    let lower = part.to_lowercase();
    if DEGREE_MARKERS.iter().any(|m| lower.contains(m)) {
        return true;
    }
    lower.split_whitespace().any(|word| {
        let compact: String = word.chars().filter(|c| c.is_alphanumeric()).collect();
        SHORT_DEGREES.contains(&compact.as_str())
    })
}

fn mentions_institution(part: &str) -> bool {
    let lower = part.to_lowercase();
    INSTITUTION_MARKERS.iter().any(|m| lower.contains(m))
}

// ────────────────────────────────────────────────────────────────────────────
// Experience
// ────────────────────────────────────────────────────────────────────────────

fn parse_experience(lines: &[&str]) -> Vec<ExperienceEntry> {
    let mut entries = Vec::new();
    let mut current: Option<ExperienceEntry> = None;
    // A bare line before any header, usually the employer name.
    let mut pending: Option<String> = None;

    for line in lines {
        let (is_bullet, text) = strip_bullet(line);
        if text.is_empty() {
            continue;
        }

        if is_bullet {
            if let Some(entry) = current.as_mut() {
                append_description(entry, text);
            }
            continue;
        }

        if let Some(mut header) = parse_experience_header(text) {
            if header.company.is_empty() {
                if let Some(company) = pending.take() {
                    header.company = company;
                }
            }
            if let Some(done) = current.take() {
                entries.push(done);
            }
            current = Some(header);
            continue;
        }

        match current.as_mut() {
            Some(entry)
                if entry.company.is_empty()
                    && entry.description.is_none()
                    && looks_like_name(text) =>
            {
                entry.company = text.to_string();
            }
            Some(entry) => append_description(entry, text),
            None => pending = Some(text.to_string()),
        }
    }

    entries.extend(current);
    entries
}

fn append_description(entry: &mut ExperienceEntry, text: &str) {
    match entry.description.as_mut() {
        Some(desc) => {
            desc.push('\n');
            desc.push_str(text);
        }
        None => entry.description = Some(text.to_string()),
    }
}

fn looks_like_name(text: &str) -> bool {
    text.split_whitespace().count() <= 6 && !text.ends_with('.')
}

/// Parses lines such as
/// `Senior Engineer at Acme (Jan 2020 - Present)` or
/// `Software Engineer | Globex | 2016 - 2019`.
fn parse_experience_header(text: &str) -> Option<ExperienceEntry> {
    if text.split_whitespace().count() > MAX_HEADER_WORDS || text.ends_with('.') {
        return None;
    }

    let (duration, rest) = split_duration(text);

    if let Some(idx) = find_ignore_ascii_case(&rest, " at ") {
        let role = rest[..idx].trim();
        let company = rest[idx + " at ".len()..].trim();
        if !role.is_empty() && !company.is_empty() {
            return Some(ExperienceEntry {
                role: role.to_string(),
                company: company.to_string(),
                duration,
                description: None,
            });
        }
    }

    let parts = split_parts(&rest);
    let structured = parts.len() >= 2
        && parts.len() <= 3
        && parts.iter().all(|p| p.split_whitespace().count() <= 6);

    if duration.is_none() && !structured {
        return None;
    }

    let mut parts = parts.into_iter();
    let role = parts.next()?;
    Some(ExperienceEntry {
        role,
        company: parts.next().unwrap_or_default(),
        duration,
        description: None,
    })
}

/// Pulls a trailing or parenthesized date range out of `text`.
fn split_duration(text: &str) -> (Option<String>, String) {
    if let (Some(open), Some(close)) = (text.find('('), text.rfind(')')) {
        if open < close {
            let inner = text[open + 1..close].trim();
            if is_date_like(inner) {
                let rest = format!("{} {}", &text[..open], &text[close + 1..]);
                return (Some(inner.to_string()), trim_separators(&rest).to_string());
            }
        }
    }

    for start in word_starts(text) {
        let tail = &text[start..];
        let first = tail
            .split(|c: char| c.is_whitespace() || c == '-' || c == '/')
            .next()
            .unwrap_or_default();
        let first = clean_word(first);
        let opens_range =
            is_year(&first) || MONTHS.contains(&first.as_str()) || DATE_WORDS.contains(&first.as_str());
        if opens_range && is_date_like(tail) {
            let head = trim_separators(&text[..start]);
            return (Some(tail.trim().to_string()), head.to_string());
        }
    }

    (None, text.trim().to_string())
}

// ────────────────────────────────────────────────────────────────────────────
// Shared helpers
// ────────────────────────────────────────────────────────────────────────────

/// Splits on the separators résumés use between role, employer and dates.
fn split_parts(text: &str) -> Vec<String> {
    const UNIT: char = '\u{1f}';
    let mut marked = text.to_string();
    for sep in [" - ", " – ", " — ", " | ", "|", ",", "\t", "(", ")"] {
        marked = marked.replace(sep, &UNIT.to_string());
    }
    marked
        .split(UNIT)
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}

fn trim_separators(text: &str) -> &str {
    text.trim_matches(|c: char| {
        c.is_whitespace() || matches!(c, ',' | '|' | '-' | '–' | '—' | '(' | ')' | ':')
    })
}

/// Byte offset of an ASCII `needle` in `haystack`, ignoring ASCII case.
/// Offsets index `haystack` itself, so they stay on char boundaries.
fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    let bytes = haystack.as_bytes();
    haystack.char_indices().map(|(idx, _)| idx).find(|&idx| {
        bytes
            .get(idx..idx + needle.len())
            .is_some_and(|window| window.eq_ignore_ascii_case(needle.as_bytes()))
    })
}

fn word_starts(text: &str) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut prev_space = true;
    for (idx, c) in text.char_indices() {
        if !c.is_whitespace() && prev_space {
            starts.push(idx);
        }
        prev_space = c.is_whitespace();
    }
    starts
}

fn clean_word(word: &str) -> String {
    word.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase()
}

fn is_year(word: &str) -> bool {
    word.len() == 4
        && word.chars().all(|c| c.is_ascii_digit())
        && matches!(word.parse::<u32>(), Ok(1900..=2099))
}

/// True when every word is a year, month, number or range word.
fn is_date_like(text: &str) -> bool {
    let words: Vec<String> = text
        .split(|c: char| c.is_whitespace() || matches!(c, '-' | '–' | '—' | '/' | ','))
        .map(clean_word)
        .filter(|w| !w.is_empty())
        .collect();

    !words.is_empty()
        && words.iter().any(|w| is_year(w) || DATE_WORDS.contains(&w.as_str()))
        && words.iter().all(|w| {
            is_year(w)
                || MONTHS.contains(&w.as_str())
                || DATE_WORDS.contains(&w.as_str())
                || w.chars().all(|c| c.is_ascii_digit())
        })
}

/// Four-digit years (1900–2099) in order of appearance.
fn find_years(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_ascii_digit())
        .filter(|run| is_year(run))
        .map(String::from)
        .collect()
}
