//! slapd configuration rendering
//!
//! Pure functions: the same [`Config`] and password hash always produce the
//! same bytes. Nothing here touches the filesystem.

use crate::config::Config;

/// Group whose members may read the whole directory. portunus-server keeps
/// it in sync with every user whose effective permissions include
/// `ldap.can_read`.
pub const VIEWERS_GROUP: &str = "portunus-viewers";

/// Attribute and object class for SSH public keys on user entries
pub const CUSTOM_SCHEMA: &str = r#"attributetype ( 1.3.6.1.4.1.24552.500.1.1.1.13
  NAME 'sshPublicKey'
  DESC 'OpenSSH public key'
  EQUALITY octetStringMatch
  SYNTAX 1.3.6.1.4.1.1466.115.121.1.40 )

objectclass ( 1.3.6.1.4.1.24552.500.1.1.2.0
  NAME 'ldapPublicKey'
  DESC 'OpenSSH LPK objectclass'
  SUP top AUXILIARY
  MAY ( sshPublicKey $ uid ) )
"#;

/// Render `slapd.conf`.
///
/// `password_hash` is the hashed form of [`Config::ldap_password`]; the
/// plaintext never appears in the output.
pub fn render_slapd_config(config: &Config, password_hash: &str) -> Vec<u8> {
    let schema_dir = config.slapd.schema_dir.display();
    let state_dir = config.slapd.state_dir.display();
    let suffix = &config.ldap_suffix;
    let service_dn = config.service_dn();

    let tls = match &config.slapd.tls {
        Some(_) => format!(
            "TLSCACertificateFile {state_dir}/ca.pem\n\
             TLSCertificateFile {state_dir}/cert.pem\n\
             TLSCertificateKeyFile {state_dir}/key.pem\n\n"
        ),
        None => String::new(),
    };

    format!(
        r#"include {schema_dir}/core.schema
include {schema_dir}/cosine.schema
include {schema_dir}/inetorgperson.schema
include {schema_dir}/nis.schema
include {state_dir}/portunus.schema

moduleload pw-sha2

access to dn.base="" by * read
access to dn.base="cn=Subschema" by * read
access to attrs=userPassword
  by dn.base="{service_dn}" write
  by anonymous auth
  by * none
access to *
  by dn.base="{service_dn}" write
  by group.exact="cn={VIEWERS_GROUP},{suffix}" read
  by self read
  by anonymous auth

{tls}database mdb
directory "{state_dir}/data"
maxsize 1073741824
suffix "{suffix}"
rootdn "{service_dn}"
rootpw "{password_hash}"

index objectClass eq
index cn,uid,mail eq,sub
index member,memberUid,uniqueMember eq

overlay memberof
"#
    )
    .into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Identity, ServerConfig, SlapdConfig, TlsConfig};
    use std::path::PathBuf;

    fn config(tls: bool) -> Config {
        Config {
            debug: false,
            ldap_suffix: "dc=example,dc=org".into(),
            ldap_password: "plaintext-secret".into(),
            server: ServerConfig {
                binary: "portunus-server".into(),
                identity: Identity::new(1001, 1001),
                http_listen: "127.0.0.1:8080".into(),
                http_secure: true,
                state_dir: PathBuf::from("/var/lib/portunus"),
            },
            slapd: SlapdConfig {
                binary: "slapd".into(),
                user: "ldap".into(),
                group: "ldap".into(),
                identity: Identity::new(55, 55),
                schema_dir: PathBuf::from("/etc/openldap/schema"),
                state_dir: PathBuf::from("/run/portunus-slapd"),
                tls: tls.then(|| TlsConfig {
                    certificate: "/etc/ssl/c.pem".into(),
                    private_key: "/etc/ssl/k.pem".into(),
                    ca_certificate: "/etc/ssl/a.pem".into(),
                    domain_name: "ldap.example.org".into(),
                }),
            },
            path: None,
        }
    }

    fn render(config: &Config) -> String {
        String::from_utf8(render_slapd_config(config, "{SSHA512}HASH")).unwrap()
    }

    #[test]
    fn test_deterministic() {
        let config = config(true);
        assert_eq!(
            render_slapd_config(&config, "{SSHA512}HASH"),
            render_slapd_config(&config, "{SSHA512}HASH")
        );
    }

    #[test]
    fn test_database_section() {
        let out = render(&config(false));
        assert!(out.contains("include /etc/openldap/schema/core.schema\n"));
        assert!(out.contains("include /run/portunus-slapd/portunus.schema\n"));
        assert!(out.contains("directory \"/run/portunus-slapd/data\"\n"));
        assert!(out.contains("suffix \"dc=example,dc=org\"\n"));
        assert!(out.contains("rootdn \"cn=portunus,dc=example,dc=org\"\n"));
        assert!(out.contains("rootpw \"{SSHA512}HASH\"\n"));
        assert!(out.contains("by group.exact=\"cn=portunus-viewers,dc=example,dc=org\" read"));
    }

    #[test]
    fn test_plaintext_password_not_rendered() {
        assert!(!render(&config(true)).contains("plaintext-secret"));
    }

    #[test]
    fn test_tls_directives() {
        let without = render(&config(false));
        assert!(!without.contains("TLS"));

        let with = render(&config(true));
        assert!(with.contains("TLSCACertificateFile /run/portunus-slapd/ca.pem\n"));
        assert!(with.contains("TLSCertificateFile /run/portunus-slapd/cert.pem\n"));
        assert!(with.contains("TLSCertificateKeyFile /run/portunus-slapd/key.pem\n"));
        // slapd reads the copies, never the originals
        assert!(!with.contains("/etc/ssl"));
        assert!(with.find("TLSCertificateFile").unwrap() < with.find("database mdb").unwrap());
    }

    #[test]
    fn test_schema_is_static() {
        assert!(CUSTOM_SCHEMA.contains("NAME 'sshPublicKey'"));
        assert!(CUSTOM_SCHEMA.contains("NAME 'ldapPublicKey'"));
    }
}
