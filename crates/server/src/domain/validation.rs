use crate::error::{AppError, Result};

pub fn required(value: &str, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

pub fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn normalize_skills(skills: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(skills.len());
    for skill in skills {
        let skill = skill.trim();
        if !skill.is_empty() && !out.iter().any(|s| s == skill) {
            out.push(skill.to_string());
        }
    }
    out
}

// `%text%` for a case-insensitive LIKE, with wildcards in the text escaped.
pub fn like_pattern(search: Option<&str>) -> Option<String> {
    let search = search.map(str::trim).filter(|s| !s.is_empty())?;
    let mut escaped = String::with_capacity(search.len() + 2);
    for c in search.to_lowercase().chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    Some(format!("%{escaped}%"))
}

pub fn non_negative(value: Option<f64>, field: &str) -> Result<()> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(AppError::Validation(format!(
            "{field} must be a non-negative number"
        ))),
        _ => Ok(()),
    }
}

pub fn positive(value: f64, field: &str) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(AppError::Validation(format!(
            "{field} must be greater than zero"
        )));
    }
    Ok(())
}

pub fn budget_range(min: Option<f64>, max: Option<f64>) -> Result<()> {
    non_negative(min, "Minimum budget")?;
    non_negative(max, "Maximum budget")?;
    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            return Err(AppError::Validation(
                "Minimum budget cannot exceed maximum budget".to_string(),
            ));
        }
    }
    Ok(())
}
