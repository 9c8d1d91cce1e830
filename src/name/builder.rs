//! Pure hostname rendering from templates

use std::collections::HashMap;

use regex::Regex;

use crate::error::{HostForgeError, Result};
use crate::types::{GroupRule, Template, TemplateGroup};

/// Render a candidate hostname from a template, a sequence number, and
/// caller-supplied group parameters.
///
/// Groups are assembled in ascending position order; gaps in the numbering
/// are skipped. A non-positive sequence number falls back to the template's
/// configured start. Deterministic for identical inputs.
pub fn render(
    template: &Template,
    sequence_num: i64,
    params: &HashMap<String, String>,
) -> Result<String> {
    let sequence_num = if sequence_num <= 0 {
        template.sequence_start
    } else {
        sequence_num
    };
    let sequence_str = format_sequence(
        sequence_num,
        template.sequence_length,
        template.sequence_padding,
    );

    let mut groups: Vec<&TemplateGroup> = template.groups.iter().collect();
    groups.sort_by_key(|g| g.position);

    let mut hostname = String::new();
    for group in groups {
        let value = resolve_group(group, &sequence_str, params);
        // The sequence segment is never cut down: a shortened sequence would
        // alias distinct numbers to the same name.
        if group.rule == GroupRule::Sequence || group.length == 0 {
            hostname.push_str(&value);
        } else {
            hostname.extend(value.chars().take(group.length));
        }
    }

    if hostname.len() > template.max_length {
        return Err(HostForgeError::validation(format!(
            "generated hostname '{}' exceeds maximum length of {} characters",
            hostname, template.max_length
        )));
    }

    Ok(hostname)
}

/// Format a sequence number, zero-padded to `length` digits when requested
pub fn format_sequence(num: i64, length: usize, padding: bool) -> String {
    if padding {
        format!("{:0width$}", num, width = length)
    } else {
        num.to_string()
    }
}

fn resolve_group(
    group: &TemplateGroup,
    sequence_str: &str,
    params: &HashMap<String, String>,
) -> String {
    match &group.rule {
        GroupRule::Fixed(literal) => literal.clone(),
        GroupRule::Sequence => sequence_str.to_string(),
        GroupRule::Regex(pattern) => match params.get(&group.name) {
            Some(value) if matches_pattern(pattern, value) => value.clone(),
            Some(value) => {
                tracing::warn!(
                    group = %group.name,
                    value = %value,
                    pattern = %pattern,
                    "group value does not match validation pattern"
                );
                if group.is_required {
                    pattern.chars().next().map(String::from).unwrap_or_else(|| "X".to_string())
                } else {
                    String::new()
                }
            }
            None => missing_param_fallback(group),
        },
        GroupRule::List(allowed) => match params.get(&group.name) {
            Some(value) if allowed.is_empty() || allowed.iter().any(|a| a == value) => {
                value.clone()
            }
            Some(value) => {
                tracing::warn!(
                    group = %group.name,
                    value = %value,
                    allowed = %allowed.join(","),
                    "group value not in allowed list"
                );
                if group.is_required {
                    allowed.first().cloned().unwrap_or_default()
                } else {
                    String::new()
                }
            }
            None => missing_param_fallback(group),
        },
    }
}

fn missing_param_fallback(group: &TemplateGroup) -> String {
    if !group.is_required {
        return String::new();
    }
    tracing::warn!(group = %group.name, "required group parameter not provided");
    match &group.rule {
        GroupRule::List(allowed) if !allowed.is_empty() => allowed[0].clone(),
        _ => "X".to_string(),
    }
}

fn matches_pattern(pattern: &str, value: &str) -> bool {
    if pattern.is_empty() {
        return true;
    }
    match Regex::new(pattern) {
        Ok(re) => re.is_match(value),
        Err(err) => {
            tracing::warn!(pattern = %pattern, error = %err, "invalid validation pattern");
            false
        }
    }
}

/// Validate a template definition against its structural invariants
pub fn validate_template(template: &Template) -> Result<()> {
    if template.max_length == 0 {
        return Err(HostForgeError::validation(
            "template max length must be positive",
        ));
    }
    if template.sequence_length == 0 {
        return Err(HostForgeError::validation("sequence length must be positive"));
    }
    if template.sequence_increment <= 0 {
        return Err(HostForgeError::validation(
            "sequence increment must be positive",
        ));
    }

    let total_length: usize = template.groups.iter().map(|g| g.length).sum();
    if total_length > template.max_length {
        return Err(HostForgeError::validation(format!(
            "sum of group lengths ({}) exceeds template max length ({})",
            total_length, template.max_length
        )));
    }

    let mut positions: Vec<u32> = template.groups.iter().map(|g| g.position).collect();
    positions.sort_unstable();
    positions.dedup();
    if positions.len() != template.groups.len() {
        return Err(HostForgeError::validation(
            "group positions must be unique within a template",
        ));
    }

    let sequence_groups = template
        .groups
        .iter()
        .filter(|g| g.rule == GroupRule::Sequence)
        .count();
    if sequence_groups != 1 {
        return Err(HostForgeError::validation(format!(
            "template must have exactly one sequence group, found {}",
            sequence_groups
        )));
    }

    Ok(())
}

/// Extract the trailing decimal digits of a hostname as its sequence number
pub fn trailing_sequence(hostname: &str) -> Result<i64> {
    let digits: String = hostname
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();

    if digits.is_empty() {
        return Err(HostForgeError::validation(format!(
            "no sequence number found in hostname '{}'",
            hostname
        )));
    }

    digits
        .parse::<i64>()
        .map_err(|e| HostForgeError::validation(format!("failed to parse sequence number: {}", e)))
}
