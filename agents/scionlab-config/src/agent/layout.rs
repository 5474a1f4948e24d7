//! Host Layout
//!
//! Installed locations of everything a bundle can carry.

use std::path::PathBuf;

use crate::cli::config::HostConfig;
use crate::cli::config_info::CONFIG_INFO_FILE;
use crate::agent::staging::{CCD_DIR, CLIENT_CONF, SERVER_CONF};

/// File holding the VPN server's Diffie-Hellman parameters
pub const DH_PARAMS_FILE: &str = "dh.pem";

#[derive(Debug, Clone)]
pub struct HostLayout {
    pub scion_root: PathBuf,
    pub gen_dir: PathBuf,
    pub config_info: PathBuf,
    pub client_conf: PathBuf,
    pub server_conf: PathBuf,
    pub ccd_dir: PathBuf,
    pub dh_params: PathBuf,
    pub wants_dir: PathBuf,
    pub target: String,
    pub scion_user: String,
    pub scion_group: String,
}

impl HostLayout {
    pub fn new(host: &HostConfig) -> Self {
        let gen_dir = host.scion_root.join(&host.gen_dir);
        Self {
            scion_root: host.scion_root.clone(),
            config_info: gen_dir.join(CONFIG_INFO_FILE),
            gen_dir,
            client_conf: host.openvpn_dir.join(CLIENT_CONF),
            server_conf: host.openvpn_dir.join(SERVER_CONF),
            ccd_dir: host.openvpn_dir.join(CCD_DIR),
            dh_params: host.openvpn_dir.join(DH_PARAMS_FILE),
            wants_dir: host.systemd_dir.join(format!("{}.wants", host.target)),
            target: host.target.clone(),
            scion_user: host.scion_user.clone(),
            scion_group: host.scion_group.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let layout = HostLayout::new(&HostConfig::default());
        assert_eq!(layout.gen_dir, PathBuf::from("/etc/scion/gen"));
        assert_eq!(
            layout.config_info,
            PathBuf::from("/etc/scion/gen/scionlab-config.json")
        );
        assert_eq!(layout.client_conf, PathBuf::from("/etc/openvpn/client.conf"));
        assert_eq!(layout.ccd_dir, PathBuf::from("/etc/openvpn/ccd"));
        assert_eq!(
            layout.wants_dir,
            PathBuf::from("/etc/systemd/system/scionlab.target.wants")
        );
    }
}
