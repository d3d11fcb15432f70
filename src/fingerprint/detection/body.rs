//! Body-based technology detection (HTML, script sources, meta tags).
//!
//! This module matches technologies based on HTML body content,
//! following wappalyzergo's `checkBody()` logic which checks:
//! 1. HTML patterns (via `matchString(body, htmlPart)`)
//! 2. Script sources (via `matchString(scriptSrc, scriptPart)`)
//! 3. Meta tags (via `matchKeyValueString(name, content, metaPart)`)

use std::collections::HashMap;

use crate::fingerprint::patterns::{check_meta_patterns, matches_pattern};
use crate::fingerprint::ruleset::get_ruleset;

/// Result of body matching for a single technology
#[derive(Debug, Clone)]
pub struct BodyMatchResult {
    pub tech_name: String,
    pub version: Option<String>,
}

/// Checks all technologies against HTML body content and returns matches.
///
/// This matches wappalyzergo's `checkBody()` flow:
/// 1. HTML patterns (checked first)
/// 2. Script sources (checked during tokenization)
/// 3. Meta tags (checked during tokenization)
/// 4. URL patterns (checked last)
///
/// wappalyzergo takes the first version found across all pattern types.
pub async fn check_body(
    html_body: &str,
    script_sources: &[String],
    meta_tags: &HashMap<String, Vec<String>>,
    url: &str,
) -> anyhow::Result<Vec<BodyMatchResult>> {
    let ruleset = get_ruleset()
        .await
        .ok_or_else(|| anyhow::anyhow!("Ruleset not initialized"))?;

    let mut results = Vec::new();

    for (tech_name, tech) in &ruleset.technologies {
        // Skip if technology has no body-related patterns
        if tech.html.is_empty()
            && tech.script.is_empty()
            && tech.meta.is_empty()
            && tech.url.is_empty()
        {
            continue;
        }

        let mut matched = false;
        let mut version: Option<String> = None;

        // 1. Check HTML patterns first (wappalyzergo checks HTML patterns before tokenizing)
        for pattern in &tech.html {
            let result = matches_pattern(pattern, html_body);
            if result.matched {
                matched = true;
                if version.is_none() && result.version.is_some() {
                    version = result.version.clone();
                }
                // If we get a version from HTML pattern, we can stop checking HTML patterns
                if version.is_some() {
                    break;
                }
            }
        }

        // 2. Check script sources (wappalyzergo checks scriptSrc during tokenization)
        // wappalyzergo iterates through scripts first, then patterns, and takes the first version found
        for script_src in script_sources {
            for pattern in &tech.script {
                let result = matches_pattern(pattern, script_src);
                if result.matched {
                    matched = true;
                    if version.is_none() && result.version.is_some() {
                        version = result.version.clone();
                    }
                    // If we found a version from this script, stop checking other patterns for this script
                    if version.is_some() {
                        break;
                    }
                }
            }
            // If we found a version, stop checking other scripts
            if version.is_some() {
                break;
            }
        }

        // 3. Check meta tags (wappalyzergo checks meta during tokenization, after scriptSrc)
        // If we already matched but have no version, check meta for version
        // If we haven't matched yet, check meta normally
        for (meta_key, patterns) in &tech.meta {
            let result = check_meta_patterns(meta_key, patterns, meta_tags);
            if result.matched {
                matched = true;
                // If we already matched via HTML/script but have no version, use version from meta
                if version.is_none() && result.version.is_some() {
                    version = result.version.clone();
                }
                // If we haven't matched yet, this is the first match
                if version.is_some() {
                    break;
                }
            }
        }

        // 4. Check URL patterns (wappalyzergo checks these last)
        for url_pattern in &tech.url {
            let result = matches_pattern(url_pattern, url);
            if result.matched {
                matched = true;
                if version.is_none() && result.version.is_some() {
                    version = result.version.clone();
                }
                if version.is_some() {
                    break;
                }
            }
        }

        if matched {
            results.push(BodyMatchResult {
                tech_name: tech_name.clone(),
                version,
            });
        }
    }

    Ok(results)
}
