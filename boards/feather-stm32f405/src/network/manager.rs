#![deny(unsafe_code)]
#![deny(warnings)]
//! Link bring-up for the `Associating` state
//!
//! Stands in for Wi-Fi association: the W5500 has no access point to join, so
//! "associated" means the PHY link is up and DHCP has produced an address.

use defmt::{info, Debug2Format};
use embassy_net::Stack;

/// Wait for the Ethernet link and a DHCP lease, then log the address
pub async fn associate(stack: &Stack<'_>) {
    if !stack.is_link_up() {
        info!("Waiting for Ethernet link...");
        stack.wait_link_up().await;
    }
    info!("Waiting for DHCP...");
    stack.wait_config_up().await;

    if let Some(config) = stack.config_v4() {
        info!("IP: {}", Debug2Format(&config.address));
        if let Some(gateway) = config.gateway {
            info!("Gateway: {}", Debug2Format(&gateway));
        }
    }
}
