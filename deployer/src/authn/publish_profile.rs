//! Publish profile parsing
//!
//! The management plane hands back a `publishData` XML document listing one
//! profile per publish method (MSDeploy, FTP, ...). The FTP entry carries
//! the user name and password the deployment plane accepts as HTTP Basic
//! credentials, with the user name prefixed by the site: `site\user`.

use secrecy::SecretString;
use serde::Deserialize;

use crate::errors::AuthError;

/// Publish method whose credentials the deployment plane accepts.
pub const FTP_PUBLISH_METHOD: &str = "FTP";

/// Root of the publish profile document
#[derive(Debug, Deserialize)]
pub struct PublishData {
    #[serde(rename = "publishProfile", default)]
    pub profiles: Vec<PublishProfile>,
}

/// One publish method entry
#[derive(Debug, Deserialize)]
pub struct PublishProfile {
    #[serde(rename = "@profileName", default)]
    pub profile_name: String,

    #[serde(rename = "@publishMethod")]
    pub publish_method: String,

    #[serde(rename = "@userName")]
    pub user_name: String,

    #[serde(rename = "@userPWD", deserialize_with = "de_secret")]
    pub user_pwd: SecretString,
}

fn de_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: serde::Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

impl PublishData {
    /// Select the FTP entry; its credentials double as the deployment
    /// plane's Basic auth pair.
    pub fn ftp_profile(self) -> Result<PublishProfile, AuthError> {
        self.profiles
            .into_iter()
            .find(|profile| profile.publish_method == FTP_PUBLISH_METHOD)
            .ok_or_else(|| AuthError::NoMatchingPublishProfile(FTP_PUBLISH_METHOD.to_string()))
    }
}

/// Parse a raw publish profile document.
pub fn parse_publish_data(xml: &str) -> Result<PublishData, AuthError> {
    quick_xml::de::from_str(xml).map_err(|e| AuthError::ProfileParse(e.to_string()))
}

/// Derive the deployment plane user from a profile user name.
///
/// Profile user names come back as `site\user`; the deployment plane wants
/// the part strictly after the first backslash. A name without the
/// separator cannot be used and is rejected outright.
pub fn deployment_username(raw: &str) -> Result<&str, AuthError> {
    match raw.split_once('\\') {
        Some((_, user)) if !user.is_empty() => Ok(user),
        _ => Err(AuthError::MalformedPublishUser(raw.to_string())),
    }
}
