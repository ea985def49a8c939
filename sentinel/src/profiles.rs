//! Named backend profiles: a JSON map of profile name -> { url, tls_ca }.
//! Stored as $XDG_CONFIG_HOME/sentinel/profiles.json (fallback ~/.config/sentinel/profiles.json).

use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs, io, path::PathBuf};

use crate::config::config_dir;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProfileEntry {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_ca: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProfilesFile {
    #[serde(default)]
    pub profiles: BTreeMap<String, ProfileEntry>,
    #[serde(default)]
    pub version: u32,
}

pub fn profiles_path() -> PathBuf {
    config_dir().join("profiles.json")
}

pub fn load_profiles() -> ProfilesFile {
    let path = profiles_path();
    match fs::read_to_string(&path) {
        Ok(s) => serde_json::from_str(&s).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "ignoring malformed profiles file");
            ProfilesFile::default()
        }),
        Err(_) => ProfilesFile::default(),
    }
}

pub fn save_profiles(p: &ProfilesFile) -> io::Result<()> {
    let path = profiles_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let data = serde_json::to_vec_pretty(p).map_err(io::Error::other)?;
    fs::write(path, data)
}

#[derive(Debug, PartialEq)]
pub enum ResolveProfile {
    /// URL came from the command line; the caller decides whether to save it.
    Direct(String, Option<String>),
    /// Found under the requested name.
    Loaded(String, Option<String>),
    /// No URL and no name: ask which saved profile to use.
    PromptSelect(Vec<String>),
    /// Unknown name: ask for a URL and save it under that name.
    PromptCreate(String),
    /// No URL, no name and nothing saved.
    None,
}

pub struct ProfileRequest {
    pub profile_name: Option<String>,
    pub url: Option<String>,
    pub tls_ca: Option<String>,
}

impl ProfileRequest {
    pub fn resolve(self, pf: &ProfilesFile) -> ResolveProfile {
        match (self.url, self.profile_name) {
            // URL given (with or without a name): connect directly, caller may persist
            (Some(u), _) => ResolveProfile::Direct(u, self.tls_ca),
            (None, Some(name)) => match pf.profiles.get(&name) {
                Some(entry) => ResolveProfile::Loaded(entry.url.clone(), entry.tls_ca.clone()),
                None => ResolveProfile::PromptCreate(name),
            },
            (None, None) if pf.profiles.is_empty() => ResolveProfile::None,
            (None, None) => ResolveProfile::PromptSelect(pf.profiles.keys().cloned().collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_with(name: &str, url: &str) -> ProfilesFile {
        let mut pf = ProfilesFile::default();
        pf.profiles.insert(
            name.into(),
            ProfileEntry {
                url: url.into(),
                tls_ca: None,
            },
        );
        pf
    }

    #[test]
    fn resolution_paths() {
        let pf = file_with("prod", "https://prod:8000");
        let req = |name: Option<&str>, url: Option<&str>| ProfileRequest {
            profile_name: name.map(Into::into),
            url: url.map(Into::into),
            tls_ca: None,
        };
        assert_eq!(
            req(Some("prod"), None).resolve(&pf),
            ResolveProfile::Loaded("https://prod:8000".into(), None)
        );
        assert_eq!(
            req(Some("dev"), None).resolve(&pf),
            ResolveProfile::PromptCreate("dev".into())
        );
        assert_eq!(
            req(Some("prod"), Some("http://x")).resolve(&pf),
            ResolveProfile::Direct("http://x".into(), None)
        );
        assert_eq!(
            req(None, None).resolve(&pf),
            ResolveProfile::PromptSelect(vec!["prod".into()])
        );
        assert_eq!(req(None, None).resolve(&ProfilesFile::default()), ResolveProfile::None);
    }
}
