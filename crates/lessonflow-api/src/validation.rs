//! Request validation shared by the write handlers

use lessonflow_db::entities::lesson;
use lessonflow_publisher::validate_publishable;

use crate::error::{validation_error, ApiResult};

const MAX_TITLE_LEN: usize = 255;

/// Trim and lowercase an email address, rejecting anything without `@`
pub fn normalize_email(email: &str) -> ApiResult<String> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(validation_error("Invalid email address")),
    }
}

pub fn validate_title(title: &str) -> ApiResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(validation_error("Title is required"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(validation_error(format!(
            "Title must be at most {} characters",
            MAX_TITLE_LEN
        )));
    }
    Ok(title.to_string())
}

/// Term and lesson numbers start at 1
pub fn validate_number(value: i32, field: &str) -> ApiResult<()> {
    if value < 1 {
        return Err(validation_error(format!("{} must be at least 1", field)));
    }
    Ok(())
}

/// Short language code such as `en`, `te` or `pt-BR`
pub fn validate_language(code: &str) -> ApiResult<()> {
    let valid = !code.is_empty()
        && code.len() <= 16
        && code.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
    if !valid {
        return Err(validation_error(format!("Invalid language code '{}'", code)));
    }
    Ok(())
}

/// Language list that must contain `primary`; defaults to just `primary`
pub fn languages_with_primary(primary: &str, available: Option<Vec<String>>) -> ApiResult<Vec<String>> {
    validate_language(primary)?;

    let mut languages: Vec<String> = Vec::new();
    for code in available.unwrap_or_else(|| vec![primary.to_string()]) {
        validate_language(&code)?;
        if !languages.contains(&code) {
            languages.push(code);
        }
    }

    if !languages.iter().any(|l| l == primary) {
        return Err(validation_error(format!(
            "Primary language '{}' must be one of the available languages",
            primary
        )));
    }

    Ok(languages)
}

pub fn validate_url(url: &str) -> ApiResult<()> {
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        return Err(validation_error(format!("Invalid URL '{}'", url)));
    }
    Ok(())
}

/// Full lesson row check, run on the merged row before every write
pub fn validate_lesson(lesson: &lesson::Model) -> ApiResult<()> {
    validate_number(lesson.lesson_number, "lesson_number")?;
    validate_title(&lesson.title)?;

    for code in lesson.content_languages_available.iter() {
        validate_language(code)?;
    }

    for (code, url) in lesson.content_urls_by_language.0.iter() {
        validate_language(code)?;
        validate_url(url)?;
    }

    for (code, url) in lesson.subtitle_urls_by_language.0.iter() {
        if !lesson.subtitle_languages.contains(code) {
            return Err(validation_error(format!(
                "Subtitle URL given for unlisted language '{}'",
                code
            )));
        }
        validate_url(url)?;
    }

    if lesson.duration_ms.is_some_and(|d| d < 0) {
        return Err(validation_error("duration_ms must not be negative"));
    }

    validate_publishable(lesson).map_err(|e| match e {
        lessonflow_publisher::PublishError::InvalidLesson { reason, .. } => validation_error(reason),
        other => validation_error(other.to_string()),
    })
}
