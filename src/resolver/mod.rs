//! Requirement resolution against the configured repositories.
//!
//! For each requirement of the project the resolver lazily loads the package's
//! distributions from every repository that lists it, then picks the highest
//! version satisfying the requirement's specifier. Stable versions are
//! preferred; pre-releases (and development releases) are only chosen when no
//! stable version matches.
//!
//! Attribution follows the aggregator: when the primary repository and another
//! repository publish the same version, the primary's distribution is chosen.
//! A newer version published only by a secondary repository still wins over
//! an older one from the primary, because selection is by version first.

use crate::config::Requirement;
use crate::repository::{Distribution, IndexClient, PackageRepositories};
use crate::version::VersionSpecifier;
use futures::future::join_all;
use std::fmt;
use tracing::{debug, info};

/// A requirement that could not be satisfied, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unresolved {
    /// Requirement name
    pub name: String,
    /// Why no distribution was selected
    pub reason: String,
}

impl fmt::Display for Unresolved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.reason)
    }
}

/// Outcome of resolving a set of requirements.
#[derive(Debug, Default)]
pub struct Resolution {
    /// Selected distribution per satisfied requirement, in requirement order
    pub resolved: Vec<Distribution>,
    /// Requirements without a matching distribution
    pub unresolved: Vec<Unresolved>,
}

impl Resolution {
    /// Whether every requirement was satisfied.
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Picks the highest candidate matching `specifier`, preferring stable
/// versions.
pub fn select_distribution<'a>(
    candidates: &'a [Distribution],
    specifier: Option<&VersionSpecifier>,
) -> Option<&'a Distribution> {
    let matching = || {
        candidates
            .iter()
            .filter(move |d| specifier.is_none_or(|spec| spec.matches(&d.info.version)))
    };

    matching()
        .filter(|d| !d.info.version.is_prerelease())
        .max_by(|a, b| a.info.version.cmp(&b.info.version))
        .or_else(|| matching().max_by(|a, b| a.info.version.cmp(&b.info.version)))
}

/// Resolves every requirement against `repositories`.
///
/// Versions are fetched concurrently for all requirements before selection.
pub async fn resolve_requirements(
    repositories: &PackageRepositories,
    client: &dyn IndexClient,
    requirements: &[Requirement],
) -> Resolution {
    join_all(
        requirements.iter().map(|req| repositories.ensure_distributions(client, &req.name)),
    )
    .await;

    let mut resolution = Resolution::default();
    for requirement in requirements {
        let candidates = repositories.find_distributions(&requirement.name).await;
        debug!("{} candidate distributions for {}", candidates.len(), requirement.name);

        if candidates.is_empty() {
            resolution.unresolved.push(Unresolved {
                name: requirement.name.clone(),
                reason: "package not found in any repository".to_string(),
            });
            continue;
        }

        match select_distribution(&candidates, requirement.specifier.as_ref()) {
            Some(selected) => {
                info!("Resolved {}", selected);
                resolution.resolved.push(selected.clone());
            }
            None => resolution.unresolved.push(Unresolved {
                name: requirement.name.clone(),
                reason: format!(
                    "no version matches '{}'",
                    requirement.specifier.as_ref().map(ToString::to_string).unwrap_or_default()
                ),
            }),
        }
    }
    resolution
}
