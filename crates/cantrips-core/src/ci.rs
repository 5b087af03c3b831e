//! CI environment detection for the `describeCI` built-in.

use serde::Serialize;
use std::fmt;

/// Known CI providers, probed in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CiProvider {
    GithubActions,
    GitlabCi,
    CircleCi,
    Travis,
    Jenkins,
    Buildkite,
    AzurePipelines,
    BitbucketPipelines,
    /// `CI` is set but no known provider matched.
    Generic,
}

impl CiProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            CiProvider::GithubActions => "GitHub Actions",
            CiProvider::GitlabCi => "GitLab CI",
            CiProvider::CircleCi => "CircleCI",
            CiProvider::Travis => "Travis CI",
            CiProvider::Jenkins => "Jenkins",
            CiProvider::Buildkite => "Buildkite",
            CiProvider::AzurePipelines => "Azure Pipelines",
            CiProvider::BitbucketPipelines => "Bitbucket Pipelines",
            CiProvider::Generic => "Generic CI",
        }
    }
}

impl fmt::Display for CiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Environment variables read for one provider.
struct ProviderVars {
    provider: CiProvider,
    marker: &'static str,
    branch: &'static [&'static str],
    commit: &'static [&'static str],
    build: &'static [&'static str],
    pull_request: &'static [&'static str],
}

const PROVIDERS: &[ProviderVars] = &[
    ProviderVars {
        provider: CiProvider::GithubActions,
        marker: "GITHUB_ACTIONS",
        branch: &["GITHUB_HEAD_REF", "GITHUB_REF_NAME"],
        commit: &["GITHUB_SHA"],
        build: &["GITHUB_RUN_ID"],
        pull_request: &[],
    },
    ProviderVars {
        provider: CiProvider::GitlabCi,
        marker: "GITLAB_CI",
        branch: &["CI_COMMIT_REF_NAME"],
        commit: &["CI_COMMIT_SHA"],
        build: &["CI_PIPELINE_ID"],
        pull_request: &["CI_MERGE_REQUEST_IID"],
    },
    ProviderVars {
        provider: CiProvider::CircleCi,
        marker: "CIRCLECI",
        branch: &["CIRCLE_BRANCH"],
        commit: &["CIRCLE_SHA1"],
        build: &["CIRCLE_BUILD_NUM"],
        pull_request: &["CIRCLE_PR_NUMBER"],
    },
    ProviderVars {
        provider: CiProvider::Travis,
        marker: "TRAVIS",
        branch: &["TRAVIS_PULL_REQUEST_BRANCH", "TRAVIS_BRANCH"],
        commit: &["TRAVIS_COMMIT"],
        build: &["TRAVIS_BUILD_NUMBER"],
        pull_request: &["TRAVIS_PULL_REQUEST"],
    },
    ProviderVars {
        provider: CiProvider::Jenkins,
        marker: "JENKINS_URL",
        branch: &["CHANGE_BRANCH", "BRANCH_NAME", "GIT_BRANCH"],
        commit: &["GIT_COMMIT"],
        build: &["BUILD_NUMBER"],
        pull_request: &["CHANGE_ID"],
    },
    ProviderVars {
        provider: CiProvider::Buildkite,
        marker: "BUILDKITE",
        branch: &["BUILDKITE_BRANCH"],
        commit: &["BUILDKITE_COMMIT"],
        build: &["BUILDKITE_BUILD_NUMBER"],
        pull_request: &["BUILDKITE_PULL_REQUEST"],
    },
    ProviderVars {
        provider: CiProvider::AzurePipelines,
        marker: "TF_BUILD",
        branch: &["SYSTEM_PULLREQUEST_SOURCEBRANCH", "BUILD_SOURCEBRANCHNAME"],
        commit: &["BUILD_SOURCEVERSION"],
        build: &["BUILD_BUILDID"],
        pull_request: &["SYSTEM_PULLREQUEST_PULLREQUESTID"],
    },
    ProviderVars {
        provider: CiProvider::BitbucketPipelines,
        marker: "BITBUCKET_BUILD_NUMBER",
        branch: &["BITBUCKET_BRANCH"],
        commit: &["BITBUCKET_COMMIT"],
        build: &["BITBUCKET_BUILD_NUMBER"],
        pull_request: &["BITBUCKET_PR_ID"],
    },
];

/// What the current process knows about the CI system running it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CiEnvironment {
    pub is_ci: bool,
    pub provider: Option<CiProvider>,
    pub branch: Option<String>,
    pub commit: Option<String>,
    pub build: Option<String>,
    pub pull_request: Option<String>,
}

impl CiEnvironment {
    pub fn detect() -> Self {
        Self::detect_with(|name| std::env::var(name).ok())
    }

    /// Detect using `lookup` instead of the process environment.
    pub fn detect_with(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).filter(|value| !value.is_empty());
        let first = |names: &[&str]| names.iter().find_map(|name| get(*name));

        if let Some(vars) = PROVIDERS.iter().find(|vars| get(vars.marker).is_some()) {
            let mut pull_request = first(vars.pull_request).filter(|pr| pr != "false");
            if vars.provider == CiProvider::GithubActions
                && get("GITHUB_EVENT_NAME").as_deref() == Some("pull_request")
            {
                pull_request = get("GITHUB_REF")
                    .and_then(|r| r.strip_prefix("refs/pull/").map(str::to_string))
                    .and_then(|r| r.split('/').next().map(str::to_string));
            }
            return Self {
                is_ci: true,
                provider: Some(vars.provider),
                branch: first(vars.branch),
                commit: first(vars.commit),
                build: first(vars.build),
                pull_request,
            };
        }

        let generic = get("CI").is_some_and(|ci| ci != "false" && ci != "0");
        Self {
            is_ci: generic,
            provider: generic.then_some(CiProvider::Generic),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn detect(vars: &[(&str, &str)]) -> CiEnvironment {
        let env: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        CiEnvironment::detect_with(|name| env.get(name).cloned())
    }

    #[test]
    fn test_no_ci() {
        assert_eq!(detect(&[]), CiEnvironment::default());
        assert!(!detect(&[("CI", "false")]).is_ci);
    }

    #[test]
    fn test_github_pull_request() {
        let env = detect(&[
            ("CI", "true"),
            ("GITHUB_ACTIONS", "true"),
            ("GITHUB_EVENT_NAME", "pull_request"),
            ("GITHUB_REF", "refs/pull/42/merge"),
            ("GITHUB_HEAD_REF", "feature/x"),
            ("GITHUB_REF_NAME", "42/merge"),
            ("GITHUB_SHA", "abc123"),
            ("GITHUB_RUN_ID", "7"),
        ]);
        assert!(env.is_ci);
        assert_eq!(env.provider, Some(CiProvider::GithubActions));
        assert_eq!(env.branch.as_deref(), Some("feature/x"));
        assert_eq!(env.commit.as_deref(), Some("abc123"));
        assert_eq!(env.build.as_deref(), Some("7"));
        assert_eq!(env.pull_request.as_deref(), Some("42"));
    }

    #[test]
    fn test_travis_non_pr_build() {
        let env = detect(&[
            ("TRAVIS", "true"),
            ("TRAVIS_BRANCH", "master"),
            ("TRAVIS_PULL_REQUEST", "false"),
        ]);
        assert_eq!(env.provider, Some(CiProvider::Travis));
        assert_eq!(env.branch.as_deref(), Some("master"));
        assert_eq!(env.pull_request, None);
    }

    #[test]
    fn test_generic_ci() {
        let env = detect(&[("CI", "1")]);
        assert!(env.is_ci);
        assert_eq!(env.provider, Some(CiProvider::Generic));
        assert_eq!(env.provider.unwrap().to_string(), "Generic CI");
    }
}
