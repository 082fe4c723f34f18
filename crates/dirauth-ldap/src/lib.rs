//! Directory-backed authentication for dirauth

pub mod ldap;

pub use ldap::{
    LdapAuthProvider, LdapClient, LdapController, PingResponse, Session,
};
