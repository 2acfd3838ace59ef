//! Hosted git repository detection.
//!
//! Recognizes the forms npm accepts for repositories on the well-known git
//! hosts and renders them back in canonical form.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// Known git hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GitHost {
    GitHub,
    GitLab,
    Bitbucket,
    SourceHut,
}

impl GitHost {
    const ALL: [Self; 4] = [Self::GitHub, Self::GitLab, Self::Bitbucket, Self::SourceHut];

    /// Shortcut prefix, as in `github:user/repo`.
    pub fn shortcut(self) -> &'static str {
        match self {
            Self::GitHub => "github",
            Self::GitLab => "gitlab",
            Self::Bitbucket => "bitbucket",
            Self::SourceHut => "sourcehut",
        }
    }

    pub fn domain(self) -> &'static str {
        match self {
            Self::GitHub => "github.com",
            Self::GitLab => "gitlab.com",
            Self::Bitbucket => "bitbucket.org",
            Self::SourceHut => "git.sr.ht",
        }
    }

    fn from_shortcut(name: &str) -> Option<Self> {
        let name = name.to_ascii_lowercase();
        Self::ALL.into_iter().find(|h| h.shortcut() == name)
    }

    fn from_domain(host: &str) -> Option<Self> {
        let host = host.to_ascii_lowercase();
        let host = host.strip_prefix("www.").unwrap_or(&host);
        Self::ALL.into_iter().find(|h| h.domain() == host)
    }

    /// Splits a repository path into `(user, project)`.
    ///
    /// GitLab allows nested groups, so everything but the last segment is
    /// the user. The other hosts take exactly two segments; GitHub also
    /// accepts `user/project/tree/<committish>`.
    fn split_path(self, path: &str) -> Option<(String, String, Option<String>)> {
        let path = path.trim_start_matches('/').trim_end_matches('/');
        let segments: Vec<&str> = path.split('/').collect();

        let (user, project, committish) = match self {
            Self::GitLab => {
                if path.contains("/-/") || path.ends_with("/archive.tar.gz") {
                    return None;
                }
                let (project, groups) = segments.split_last()?;
                (groups.join("/"), *project, None)
            }
            Self::GitHub => match segments.as_slice() {
                [user, project] => ((*user).to_string(), *project, None),
                [user, project, "tree", committish] => {
                    ((*user).to_string(), *project, Some((*committish).to_string()))
                }
                _ => return None,
            },
            Self::Bitbucket | Self::SourceHut => match segments.as_slice() {
                [user, project] => ((*user).to_string(), *project, None),
                _ => return None,
            },
        };

        let project = project.strip_suffix(".git").unwrap_or(project);
        if user.is_empty() || project.is_empty() {
            return None;
        }
        Some((user, project.to_string(), committish))
    }
}

/// How the repository was written, and so how it is written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representation {
    Shortcut,
    Https,
    SshUrl,
    Git,
}

/// A repository on a known git host.
///
/// # Examples
///
/// ```
/// use specsrv_npm::{GitHost, HostedGit};
///
/// let repo = HostedGit::from_spec("git@gitlab.com:gitlab-org/gitlab.git").unwrap();
/// assert_eq!(repo.host, GitHost::GitLab);
/// assert_eq!(repo.to_string(), "git+ssh://git@gitlab.com/gitlab-org/gitlab.git");
/// assert_eq!(repo.shortcut(), "gitlab:gitlab-org/gitlab");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedGit {
    pub host: GitHost,
    pub user: String,
    pub project: String,
    pub committish: Option<String>,
    pub representation: Representation,
}

impl HostedGit {
    /// Recognizes a hosted repository in any form npm accepts.
    ///
    /// Returns `None` for anything that is not unambiguously a repository on
    /// one of the [`GitHost`]s.
    pub fn from_spec(spec: &str) -> Option<Self> {
        static SCP: Lazy<Regex> = Lazy::new(|| Regex::new(r"^git@([^:/\s]+):(.+)$").unwrap());
        static URL: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r"(?i)^(git\+ssh|ssh|git\+https|git\+http|https|http|git)://(?:[^@/\s]+@)?([^/:\s]+)(?::\d+)?[/:](.+)$")
                .unwrap()
        });
        static SHORTCUT: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"^([a-zA-Z]+):([^/].*)$").unwrap());

        if is_github_shorthand(spec) {
            let (body, committish) = split_committish(spec);
            return Self::build(GitHost::GitHub, body, committish, Representation::Shortcut);
        }

        let (body, committish) = split_committish(spec);

        if let Some(caps) = SHORTCUT.captures(body)
            && let Some(host) = GitHost::from_shortcut(&caps[1])
        {
            return Self::build(host, &caps[2], committish, Representation::Shortcut);
        }

        if let Some(caps) = SCP.captures(body)
            && let Some(host) = GitHost::from_domain(&caps[1])
        {
            return Self::build(host, &caps[2], committish, Representation::SshUrl);
        }

        if let Some(caps) = URL.captures(body)
            && let Some(host) = GitHost::from_domain(&caps[2])
        {
            let representation = match caps[1].to_ascii_lowercase().as_str() {
                "git+ssh" | "ssh" => Representation::SshUrl,
                "git" => Representation::Git,
                _ => Representation::Https,
            };
            return Self::build(host, &caps[3], committish, representation);
        }

        None
    }

    fn build(
        host: GitHost,
        path: &str,
        committish: Option<&str>,
        representation: Representation,
    ) -> Option<Self> {
        let (user, project, path_committish) = host.split_path(path)?;
        Some(Self {
            host,
            user,
            project,
            committish: committish.map(str::to_string).or(path_committish),
            representation,
        })
    }

    fn suffix(&self) -> String {
        self.committish
            .as_deref()
            .map(|c| format!("#{}", c))
            .unwrap_or_default()
    }

    /// `github:user/project#committish`
    pub fn shortcut(&self) -> String {
        format!("{}:{}/{}{}", self.host.shortcut(), self.user, self.project, self.suffix())
    }

    /// `git+https://github.com/user/project.git#committish`
    pub fn https(&self) -> String {
        format!(
            "git+https://{}/{}/{}.git{}",
            self.host.domain(),
            self.user,
            self.project,
            self.suffix()
        )
    }

    /// `git+ssh://git@github.com/user/project.git#committish`
    pub fn ssh_url(&self) -> String {
        format!(
            "git+ssh://git@{}/{}/{}.git{}",
            self.host.domain(),
            self.user,
            self.project,
            self.suffix()
        )
    }

    /// `git://github.com/user/project.git#committish`
    pub fn git_url(&self) -> String {
        format!(
            "git://{}/{}/{}.git{}",
            self.host.domain(),
            self.user,
            self.project,
            self.suffix()
        )
    }
}

/// Renders the form the repository was written in.
impl fmt::Display for HostedGit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = match self.representation {
            Representation::Shortcut => self.shortcut(),
            Representation::Https => self.https(),
            Representation::SshUrl => self.ssh_url(),
            Representation::Git => self.git_url(),
        };
        f.write_str(&rendered)
    }
}

fn split_committish(spec: &str) -> (&str, Option<&str>) {
    match spec.split_once('#') {
        Some((body, committish)) if !committish.is_empty() => (body, Some(committish)),
        Some((body, _)) => (body, None),
        None => (spec, None),
    }
}

/// `user/project`, optionally followed by `#committish`.
///
/// Spaces, `@` and `:` may only appear after the `#`, there is exactly one
/// slash before it, and the specifier does not start with a dot.
fn is_github_shorthand(spec: &str) -> bool {
    let body = spec.split_once('#').map_or(spec, |(body, _)| body);

    let Some(slash) = body.find('/') else {
        return false;
    };

    slash > 0
        && !body[slash + 1..].contains('/')
        && !body.ends_with('/')
        && !body.starts_with('.')
        && !body.contains(char::is_whitespace)
        && !body.contains('@')
        && !body.contains(':')
}
