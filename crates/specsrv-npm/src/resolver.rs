//! npm package-argument resolution.
//!
//! [`NpmSpecResolver`] decides what kind of specifier a string is, the way
//! npm does when it reads a `dependencies` entry or a command line argument.
//! Checks run in a fixed order: local paths, `npm:` aliases, hosted git,
//! other URLs, bare paths, and finally the registry (versions, ranges, tags).

use crate::error::{NpmSpecError, Result};
use crate::hosted::{HostedGit, Representation};
use crate::range::NpmRangeParser;
use crate::version::parse_loose;
use once_cell::sync::Lazy;
use regex::Regex;
use specsrv_core::{ParsedRange, RangeParser, ResolveError, ResolvedSpec, SpecifierResolver};

const DEFAULT_TAG: &str = "latest";

const GIT_PROTOCOLS: &[&str] = &[
    "git:",
    "git+http:",
    "git+https:",
    "git+rsync:",
    "git+ftp:",
    "git+file:",
    "git+ssh:",
];

static FILESPEC: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:[.]|~/|[/\\]|[a-zA-Z]:)").unwrap());
static FILE_PROTOCOL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^file:").unwrap());
static ALIAS_PROTOCOL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^npm:").unwrap());
static URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^(?:git[+])?[a-z]+:").unwrap());
static TARBALL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)[.](?:tgz|tar\.gz|tar)$").unwrap());
static SCP_GIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^[^@]+@[^:.]+\.[^:]+:.+$").unwrap());

/// Resolves specifiers with npm's rules.
///
/// Also serves as the [`RangeParser`] for the ranges it classifies, so one
/// value covers both capabilities a classifier needs.
///
/// # Examples
///
/// ```
/// use specsrv_npm::NpmSpecResolver;
///
/// let resolver = NpmSpecResolver::new();
/// let spec = resolver.resolve_spec(Some("foo"), "npm:@bar/baz@^1.2.3").unwrap();
/// assert_eq!(spec.spec_type, "alias");
///
/// let target = spec.sub_spec.unwrap();
/// assert_eq!(target.name.as_deref(), Some("@bar/baz"));
/// assert_eq!(target.spec_type, "range");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct NpmSpecResolver {
    ranges: NpmRangeParser,
}

impl NpmSpecResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves `spec` as the specifier of package `name`.
    ///
    /// # Errors
    ///
    /// Any [`NpmSpecError`]: bad package name, unsupported URL scheme,
    /// alias to a non-registry target, or a tag with unsafe characters.
    pub fn resolve_spec(&self, name: Option<&str>, spec: &str) -> Result<ResolvedSpec> {
        if let Some(name) = name {
            validate_package_name(name)?;
        }

        let mut resolved = if !spec.is_empty()
            && (FILESPEC.is_match(spec) || FILE_PROTOCOL.is_match(spec))
        {
            from_file(spec)
        } else if ALIAS_PROTOCOL.is_match(spec) {
            self.from_alias(spec)?
        } else if let Some(hosted) = HostedGit::from_spec(spec) {
            from_hosted(spec, &hosted)
        } else if URL.is_match(spec) {
            from_url(spec)?
        } else if spec.contains('/') || TARBALL.is_match(spec) {
            from_file(spec)
        } else {
            self.from_registry(name, spec)?
        };

        resolved.name = name.map(str::to_string);
        tracing::trace!(spec, spec_type = %resolved.spec_type, "resolved npm specifier");
        Ok(resolved)
    }

    /// Resolves a combined `name@spec` argument.
    ///
    /// Scoped names keep their leading `@`. A bare valid package name means
    /// the default tag, anything else is resolved as a specifier without a
    /// package name.
    pub fn resolve_arg(&self, arg: &str) -> Result<ResolvedSpec> {
        let name_end = if let Some(scoped) = arg.strip_prefix('@') {
            scoped.find('@').map(|i| i + 1)
        } else {
            arg.find('@')
        };
        let name_part = match name_end {
            Some(end) if end > 0 => &arg[..end],
            _ => arg,
        };

        if URL.is_match(arg) {
            self.resolve_spec(None, arg)
        } else if SCP_GIT.is_match(arg) {
            self.resolve_spec(None, &format!("git+ssh://{}", arg))
        } else if !name_part.starts_with('@')
            && (name_part.contains('/') || TARBALL.is_match(name_part))
        {
            self.resolve_spec(None, arg)
        } else if let Some(end) = name_end.filter(|&end| end > 0) {
            self.resolve_spec(Some(&arg[..end]), &arg[end + 1..])
        } else if validate_package_name(arg).is_ok() {
            self.resolve_spec(Some(arg), "")
        } else {
            self.resolve_spec(None, arg)
        }
    }

    fn from_alias(&self, spec: &str) -> Result<ResolvedSpec> {
        let target = self.resolve_arg(&spec[4..])?;

        if target.spec_type == "alias" {
            return Err(NpmSpecError::invalid_alias(spec, "nested aliases not supported"));
        }
        if !target.is_registry() {
            return Err(NpmSpecError::invalid_alias(
                spec,
                "aliases only work for registry deps",
            ));
        }

        Ok(ResolvedSpec::new("alias", spec).with_sub_spec(target))
    }

    fn from_registry(&self, name: Option<&str>, spec: &str) -> Result<ResolvedSpec> {
        let fetch = if spec.is_empty() {
            DEFAULT_TAG
        } else {
            spec.trim()
        };

        let spec_type = if parse_loose(fetch).is_some() {
            "version"
        } else if self.ranges.is_valid(fetch) {
            "range"
        } else if is_uri_component_safe(fetch) {
            "tag"
        } else {
            return Err(NpmSpecError::InvalidTagName {
                tag: fetch.to_string(),
                spec: match name {
                    Some(name) => format!("{}@{}", name, spec),
                    None => spec.to_string(),
                },
            });
        };

        Ok(ResolvedSpec::new(spec_type, spec).with_fetch_spec(fetch))
    }
}

impl SpecifierResolver for NpmSpecResolver {
    fn resolve(&self, name: &str, spec: &str) -> std::result::Result<ResolvedSpec, ResolveError> {
        self.resolve_spec(Some(name), spec).map_err(Into::into)
    }
}

impl RangeParser for NpmSpecResolver {
    fn parse_range(&self, range: &str) -> std::result::Result<ParsedRange, ResolveError> {
        self.ranges.parse_range(range)
    }
}

fn from_file(spec: &str) -> ResolvedSpec {
    let path = FILE_PROTOCOL.replace(spec, "");
    let spec_type = if TARBALL.is_match(&path) {
        "file"
    } else {
        "directory"
    };
    ResolvedSpec::new(spec_type, spec)
        .with_save_spec(format!("file:{}", path))
        .with_fetch_spec(path)
}

fn from_hosted(spec: &str, hosted: &HostedGit) -> ResolvedSpec {
    let resolved = ResolvedSpec::new("git", spec).with_save_spec(hosted.to_string());
    match hosted.representation {
        Representation::Shortcut => resolved,
        _ => resolved.with_fetch_spec(hosted.to_string()),
    }
}

fn from_url(spec: &str) -> Result<ResolvedSpec> {
    let protocol = match spec.find(':') {
        Some(i) => spec[..=i].to_ascii_lowercase(),
        None => String::new(),
    };

    if GIT_PROTOCOLS.contains(&protocol.as_str()) {
        let fetch = spec.split_once('#').map_or(spec, |(body, _)| body);
        let fetch = fetch.strip_prefix("git+").unwrap_or(fetch);
        return Ok(ResolvedSpec::new("git", spec)
            .with_save_spec(spec)
            .with_fetch_spec(fetch));
    }

    match protocol.as_str() {
        "http:" | "https:" => Ok(ResolvedSpec::new("remote", spec)
            .with_save_spec(spec)
            .with_fetch_spec(spec)),
        _ => Err(NpmSpecError::UnsupportedProtocol {
            protocol,
            spec: spec.to_string(),
        }),
    }
}

/// True when URI-component encoding would leave `s` unchanged.
fn is_uri_component_safe(s: &str) -> bool {
    s.chars().all(|c| {
        c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '!' | '~' | '*' | '\'' | '(' | ')')
    })
}

/// Checks a package name against npm's naming rules for existing packages.
///
/// # Errors
///
/// [`NpmSpecError::InvalidPackageName`] naming the first rule broken.
pub fn validate_package_name(name: &str) -> Result<()> {
    static SCOPED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^@([^/]+)/([^/]+)$").unwrap());

    let reject = |reason: &str| {
        Err(NpmSpecError::InvalidPackageName {
            name: name.to_string(),
            reason: reason.to_string(),
        })
    };

    if name.is_empty() {
        return reject("name length must be greater than zero");
    }
    if name.starts_with('.') {
        return reject("name cannot start with a period");
    }
    if name.starts_with('_') {
        return reject("name cannot start with an underscore");
    }
    if name.trim() != name {
        return reject("name cannot contain leading or trailing spaces");
    }
    if matches!(name.to_ascii_lowercase().as_str(), "node_modules" | "favicon.ico") {
        return reject("name is blacklisted");
    }

    let url_friendly = is_uri_component_safe(name)
        || SCOPED
            .captures(name)
            .is_some_and(|caps| is_uri_component_safe(&caps[1]) && is_uri_component_safe(&caps[2]));
    if !url_friendly {
        return reject("name can only contain URL-friendly characters");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(spec: &str) -> ResolvedSpec {
        NpmSpecResolver::new()
            .resolve_spec(Some("foo"), spec)
            .unwrap_or_else(|e| panic!("{:?} failed: {}", spec, e))
    }

    fn resolve_err(spec: &str) -> NpmSpecError {
        NpmSpecResolver::new()
            .resolve_spec(Some("foo"), spec)
            .expect_err(spec)
    }

    #[test]
    fn test_registry_types() {
        let tag = resolve("");
        assert_eq!(tag.spec_type, "tag");
        assert_eq!(tag.fetch_spec.as_deref(), Some("latest"));
        assert_eq!(tag.raw_spec, "");

        assert_eq!(resolve("1.2.3").spec_type, "version");
        assert_eq!(resolve("v1.2.3").spec_type, "version");
        assert_eq!(resolve("4.2.3rc0").spec_type, "version");
        assert_eq!(resolve("^1.2.3").spec_type, "range");
        assert_eq!(resolve("1.x").spec_type, "range");
        assert_eq!(resolve("*").spec_type, "range");
        assert_eq!(resolve("cats").spec_type, "tag");
        assert_eq!(resolve("1.x.y").spec_type, "tag");
        assert_eq!(resolve("latest").fetch_spec.as_deref(), Some("latest"));
        assert_eq!(resolve("foo").name.as_deref(), Some("foo"));
    }

    #[test]
    fn test_invalid_tag_name() {
        let err = resolve_err("^sp-reponse");
        assert_eq!(err.code(), "EINVALIDTAGNAME");
        assert!(err.to_string().contains("\"foo@^sp-reponse\""));

        assert_eq!(resolve_err("not a valid spec !!").code(), "EINVALIDTAGNAME");
    }

    #[test]
    fn test_files_and_directories() {
        let file = resolve("file:../foo.tgz");
        assert_eq!(file.spec_type, "file");
        assert_eq!(file.raw_spec, "file:../foo.tgz");
        assert_eq!(file.fetch_spec.as_deref(), Some("../foo.tgz"));

        assert_eq!(resolve("file:../foo").spec_type, "directory");
        assert_eq!(resolve("./some/file.tgz").spec_type, "file");
        assert_eq!(resolve("./some/dir").spec_type, "directory");
        assert_eq!(resolve("/some/dir").spec_type, "directory");
        assert_eq!(resolve("~/pkg").spec_type, "directory");
        assert_eq!(resolve("C:\\pkg").spec_type, "directory");
        assert_eq!(resolve("some/dir/file.tgz").spec_type, "file");
        assert_eq!(resolve("some/other/dir").spec_type, "directory");
        assert_eq!(resolve("pkg.tar.gz").spec_type, "file");
    }

    #[test]
    fn test_hosted_git() {
        let short = resolve("some/dir");
        assert_eq!(short.spec_type, "git");
        assert_eq!(short.save_spec.as_deref(), Some("github:some/dir"));
        assert!(short.fetch_spec.is_none());

        assert_eq!(
            resolve("some/file.tgz").save_spec.as_deref(),
            Some("github:some/file.tgz")
        );
        let https = resolve("https://gitlab.com/gitlab-org/gitlab");
        assert_eq!(
            https.save_spec.as_deref(),
            Some("git+https://gitlab.com/gitlab-org/gitlab.git")
        );
        assert_eq!(https.fetch_spec, https.save_spec);
        assert_eq!(
            resolve("git@gitlab.com:gitlab-org/gitlab.git").save_spec.as_deref(),
            Some("git+ssh://git@gitlab.com/gitlab-org/gitlab.git")
        );
    }

    #[test]
    fn test_urls() {
        let remote = resolve("http://somewhere.com/blob.tgz");
        assert_eq!(remote.spec_type, "remote");
        assert_eq!(remote.raw_spec, "http://somewhere.com/blob.tgz");
        assert_eq!(resolve("https://mydomain.com/gitlab-org/gitlab").spec_type, "remote");

        let git = resolve("git+https://example.com/x.git#main");
        assert_eq!(git.spec_type, "git");
        assert_eq!(git.save_spec.as_deref(), Some("git+https://example.com/x.git#main"));
        assert_eq!(git.fetch_spec.as_deref(), Some("https://example.com/x.git"));
    }

    #[test]
    fn test_unsupported_protocol() {
        let err = resolve_err("ht://stuff.cat");
        assert_eq!(err.code(), "EUNSUPPORTEDPROTOCOL");
        assert_eq!(err.to_string(), "Unsupported URL Type \"ht:\": ht://stuff.cat");
        assert_eq!(resolve_err("github:nope").code(), "EUNSUPPORTEDPROTOCOL");
    }

    #[test]
    fn test_aliases() {
        let alias = resolve("npm:bar@^1.2.3");
        assert_eq!(alias.spec_type, "alias");
        let target = alias.sub_spec.as_deref().unwrap();
        assert_eq!(target.name.as_deref(), Some("bar"));
        assert_eq!(target.fetch_spec.as_deref(), Some("^1.2.3"));

        let target = resolve("npm:bar").sub_spec.unwrap();
        assert_eq!(target.spec_type, "tag");
        assert_eq!(target.fetch_spec.as_deref(), Some("latest"));

        let target = resolve("npm:@bar/baz@qux").sub_spec.unwrap();
        assert_eq!(target.name.as_deref(), Some("@bar/baz"));
        assert_eq!(target.fetch_spec.as_deref(), Some("qux"));

        let unnamed = resolve("npm:").sub_spec.unwrap();
        assert!(unnamed.name.is_none());
        assert_eq!(unnamed.fetch_spec.as_deref(), Some("latest"));
    }

    #[test]
    fn test_invalid_aliases() {
        assert_eq!(resolve_err("npm:a@npm:b@1").code(), "EINVALIDALIAS");
        assert_eq!(resolve_err("npm:bar@github:a/b").code(), "EINVALIDALIAS");
        assert_eq!(resolve_err("npm:bar@file:../x").code(), "EINVALIDALIAS");
    }

    #[test]
    fn test_resolve_arg() {
        let resolver = NpmSpecResolver::new();
        let scoped = resolver.resolve_arg("@scope/pkg@1.0.0").unwrap();
        assert_eq!(scoped.name.as_deref(), Some("@scope/pkg"));
        assert_eq!(scoped.spec_type, "version");

        let bare = resolver.resolve_arg("lodash").unwrap();
        assert_eq!(bare.name.as_deref(), Some("lodash"));
        assert_eq!(bare.fetch_spec.as_deref(), Some("latest"));

        let scp = resolver.resolve_arg("git@example.com:team/repo.git").unwrap();
        assert_eq!(scp.spec_type, "git");
        assert_eq!(
            scp.save_spec.as_deref(),
            Some("git+ssh://git@example.com:team/repo.git")
        );
    }

    #[test]
    fn test_package_names() {
        assert!(validate_package_name("foo").is_ok());
        assert!(validate_package_name("@bar/baz").is_ok());
        assert!(validate_package_name("Some.Old_Name").is_ok());
        for bad in ["", ".hidden", "_private", " pad", "node_modules", "a b", "@a/b/c"] {
            let err = validate_package_name(bad).unwrap_err();
            assert_eq!(err.code(), "EINVALIDPACKAGENAME", "{:?}", bad);
        }
    }

    #[test]
    fn test_bad_name_rejected_before_spec() {
        let err = NpmSpecResolver::new()
            .resolve_spec(Some("bad name"), "1.0.0")
            .unwrap_err();
        assert_eq!(err.code(), "EINVALIDPACKAGENAME");
    }

    #[test]
    fn test_capability_traits() {
        let resolver = NpmSpecResolver::new();
        let err = resolver.resolve("foo", "ht://stuff.cat").unwrap_err();
        assert_eq!(err.code, "EUNSUPPORTEDPROTOCOL");
        assert_eq!(resolver.parse_range("^1.2.3").unwrap().len(), 1);
    }
}
