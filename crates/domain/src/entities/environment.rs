//! Environment alias table
//!
//! An identity provider can be reachable through several host names that
//! all issue the same tokens. Cache lookups treat every host of one alias
//! group as the same logical environment.

/// Groups of host names that name one logical environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentAliases {
    groups: Vec<Vec<String>>,
}

impl Default for EnvironmentAliases {
    fn default() -> Self {
        Self::empty()
            .with_group([
                "login.microsoftonline.com",
                "login.windows.net",
                "login.microsoft.com",
                "sts.windows.net",
            ])
            .with_group(["login.partner.microsoftonline.cn", "login.chinacloudapi.cn"])
            .with_group(["login.microsoftonline.de"])
            .with_group(["login.microsoftonline.us", "login.usgovcloudapi.net"])
            .with_group(["login-us.microsoftonline.com"])
    }
}

impl EnvironmentAliases {
    /// A table without any alias groups (every host stands alone).
    #[must_use]
    pub const fn empty() -> Self {
        Self { groups: Vec::new() }
    }

    /// Add one alias group.
    #[must_use]
    pub fn with_group<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let group: Vec<String> =
            hosts.into_iter().map(|host| host.as_ref().to_ascii_lowercase()).collect();
        if !group.is_empty() {
            self.groups.push(group);
        }
        self
    }

    /// Whether two hosts name the same logical environment.
    #[must_use]
    pub fn are_equivalent(&self, left: &str, right: &str) -> bool {
        if left.eq_ignore_ascii_case(right) {
            return true;
        }
        self.group_of(left).is_some_and(|group| group.iter().any(|h| h.eq_ignore_ascii_case(right)))
    }

    /// Every host equivalent to `environment`, including itself (lowercased).
    #[must_use]
    pub fn aliases_of(&self, environment: &str) -> Vec<String> {
        self.group_of(environment)
            .map_or_else(|| vec![environment.to_ascii_lowercase()], <[String]>::to_vec)
    }

    fn group_of(&self, environment: &str) -> Option<&[String]> {
        self.groups
            .iter()
            .find(|group| group.iter().any(|host| host.eq_ignore_ascii_case(environment)))
            .map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_aliases_are_equivalent() {
        let aliases = EnvironmentAliases::default();
        assert!(aliases.are_equivalent("login.windows.net", "LOGIN.microsoftonline.com"));
        assert!(aliases.are_equivalent("login.chinacloudapi.cn", "login.partner.microsoftonline.cn"));
        assert!(!aliases.are_equivalent("login.microsoftonline.com", "login.microsoftonline.us"));
    }

    #[test]
    fn unknown_hosts_only_match_themselves() {
        let aliases = EnvironmentAliases::default();
        assert!(aliases.are_equivalent("idp.example.com", "IDP.example.com"));
        assert!(!aliases.are_equivalent("idp.example.com", "login.windows.net"));
        assert_eq!(aliases.aliases_of("IdP.Example.com"), vec!["idp.example.com".to_string()]);
    }

    #[test]
    fn custom_groups() {
        let aliases = EnvironmentAliases::empty().with_group(["a.example", "b.example"]);
        assert!(aliases.are_equivalent("A.example", "b.example"));
        assert_eq!(aliases.aliases_of("b.example").len(), 2);
    }
}
