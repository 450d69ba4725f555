use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{ClientId, DomainError, DomainResult, Entity, Timestamps};

/// Contact information for a client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl ContactInfo {
    /// Normalizes first, so blank fields are absent rather than invalid.
    fn validate(&self) -> DomainResult<()> {
        if let Some(email) = &self.clone().normalized().email {
            if !email.contains('@') {
                return Err(DomainError::validation("email must contain '@'"));
            }
        }
        Ok(())
    }

    /// Trim fields and collapse blank strings to `None`.
    fn normalized(self) -> Self {
        fn clean(v: Option<String>) -> Option<String> {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        }
        Self {
            email: clean(self.email),
            phone: clean(self.phone),
        }
    }
}

/// A client that holds its own stock ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    #[serde(flatten)]
    pub contact: ContactInfo,
    #[serde(flatten)]
    pub timestamps: Timestamps,
}

impl Entity for Client {
    type Id = ClientId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewClient {
    pub name: String,
    #[serde(flatten)]
    pub contact: ContactInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientUpdate {
    pub name: String,
    #[serde(flatten)]
    pub contact: ContactInfo,
}

fn validate_name(name: &str) -> DomainResult<()> {
    if name.trim().is_empty() {
        return Err(DomainError::validation("name cannot be empty"));
    }
    Ok(())
}

impl NewClient {
    pub fn validate(&self) -> DomainResult<()> {
        validate_name(&self.name)?;
        self.contact.validate()
    }
}

impl ClientUpdate {
    pub fn validate(&self) -> DomainResult<()> {
        validate_name(&self.name)?;
        self.contact.validate()
    }
}

impl Client {
    pub fn create(id: ClientId, input: NewClient, now: DateTime<Utc>) -> DomainResult<Self> {
        input.validate()?;
        Ok(Self {
            id,
            name: input.name.trim().to_string(),
            contact: input.contact.normalized(),
            timestamps: Timestamps::created(now),
        })
    }

    pub fn apply_update(&mut self, update: ClientUpdate, now: DateTime<Utc>) -> DomainResult<()> {
        update.validate()?;
        self.name = update.name.trim().to_string();
        self.contact = update.contact.normalized();
        self.timestamps.touch(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_client(name: &str, email: Option<&str>) -> NewClient {
        NewClient {
            name: name.to_string(),
            contact: ContactInfo {
                email: email.map(str::to_string),
                phone: Some("  ".to_string()),
            },
        }
    }

    #[test]
    fn create_normalizes_contact() {
        let c = Client::create(ClientId::new(), new_client(" Acme ", Some(" ops@acme.io ")), Utc::now()).unwrap();
        assert_eq!(c.name, "Acme");
        assert_eq!(c.contact.email.as_deref(), Some("ops@acme.io"));
        assert_eq!(c.contact.phone, None);
    }

    #[test]
    fn create_rejects_blank_name() {
        assert!(Client::create(ClientId::new(), new_client("", None), Utc::now()).is_err());
    }

    #[test]
    fn create_rejects_email_without_at() {
        let err = Client::create(ClientId::new(), new_client("Acme", Some("nope")), Utc::now()).unwrap_err();
        assert_eq!(err, DomainError::validation("email must contain '@'"));
    }

    #[test]
    fn blank_contact_fields_are_both_dropped() {
        let mut input = new_client("Acme", Some("   "));
        input.contact.phone = Some("".into());
        let c = Client::create(ClientId::new(), input, Utc::now()).unwrap();
        assert_eq!(c.contact, ContactInfo::default());

        let err = Client::create(ClientId::new(), new_client("Acme", Some(" nope ")), Utc::now()).unwrap_err();
        assert_eq!(err, DomainError::validation("email must contain '@'"));
    }

    #[test]
    fn update_replaces_contact_and_touches() {
        let t0 = Utc::now();
        let mut c = Client::create(ClientId::new(), new_client("Acme", None), t0).unwrap();
        let t1 = t0 + chrono::Duration::seconds(1);
        c.apply_update(
            ClientUpdate {
                name: "Acme Ltd".into(),
                contact: ContactInfo {
                    email: None,
                    phone: Some("555".into()),
                },
            },
            t1,
        )
        .unwrap();
        assert_eq!(c.name, "Acme Ltd");
        assert_eq!(c.contact.phone.as_deref(), Some("555"));
        assert_eq!(c.timestamps.updated_at, t1);
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn any_nonblank_name_without_email_is_accepted(name in "[A-Za-z][A-Za-z0-9 ]{0,60}") {
                let c = Client::create(ClientId::new(), new_client(&name, None), Utc::now());
                prop_assert!(c.is_ok());
                prop_assert_eq!(c.unwrap().name, name.trim().to_string());
            }
        }
    }
}
