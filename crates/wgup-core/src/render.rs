//! `wg-quick` configuration rendering.
//!
//! Both functions are pure: equal input always yields byte-identical text.
//! Set-valued fields (peers, NAT destinations) are stored ordered, so the
//! output is stable across runs.

use std::fmt::Write;

use crate::interface::Interface;
use crate::peer::Peer;

/// First line of every rendered file.
pub const HEADER: &str = "# Generated by wgup";

/// Keepalive sent by peers so they stay reachable behind NAT.
pub const PERSISTENT_KEEPALIVE: u16 = 10;

/// Renders the server-side configuration of `iface`.
///
/// Layout: `[Interface]` with keys, addresses and port; a forwarding block
/// allowing traffic inside the VPN; when NAT is enabled, a forwarding block
/// between the VPN and NAT interfaces and one MASQUERADE rule per NAT
/// destination; then one `[Peer]` section per peer, sorted by name.
#[must_use]
pub fn interface_config(iface: &Interface) -> String {
    let mut output = String::new();
    let vpn = iface.name();

    let _ = writeln!(output, "{HEADER}");
    output.push('\n');
    output.push_str("[Interface]\n");
    let _ = writeln!(output, "PrivateKey = {}", iface.private_key());
    let _ = writeln!(output, "Address = {}", iface.addr4());
    let _ = writeln!(output, "Address = {}", iface.addr6());
    let _ = writeln!(output, "ListenPort = {}", iface.port());

    output.push('\n');
    output.push_str("# Firewall: Allow traffic flow within VPN interface\n");
    for table in ["iptables", "ip6tables"] {
        let _ = writeln!(output, "PostUp = {table} -I FORWARD -i {vpn} -o {vpn} -j ACCEPT");
    }
    output.push('\n');
    for table in ["iptables", "ip6tables"] {
        let _ = writeln!(output, "PreDown = {table} -D FORWARD -i {vpn} -o {vpn} -j ACCEPT");
    }

    if let Some(nat) = iface.nat_iface() {
        write_nat_rules(&mut output, iface, nat);
    }

    for peer in iface.peers() {
        output.push('\n');
        let _ = writeln!(output, "# Peer \"{}\"", peer.name());
        output.push_str("[Peer]\n");
        let _ = writeln!(output, "PublicKey = {}", peer.public_key());
        let _ = writeln!(output, "PresharedKey = {}", peer.preshared_key());
        let _ = writeln!(output, "AllowedIPs = {}", peer.cidr4());
        let _ = writeln!(output, "AllowedIPs = {}", peer.cidr6());
    }

    output
}

fn write_nat_rules(output: &mut String, iface: &Interface, nat: &str) {
    let vpn = iface.name();
    let flows = [
        ("iptables", vpn, nat),
        ("ip6tables", vpn, nat),
        ("iptables", nat, vpn),
        ("ip6tables", nat, vpn),
    ];

    output.push('\n');
    output.push_str("# Firewall: Allow traffic flow between VPN interface and NAT interface\n");
    for (table, from, to) in flows {
        let _ = writeln!(output, "PostUp = {table} -I FORWARD -i {from} -o {to} -j ACCEPT");
    }
    output.push('\n');
    for (table, from, to) in flows {
        let _ = writeln!(output, "PreDown = {table} -D FORWARD -i {from} -o {to} -j ACCEPT");
    }

    let destinations: Vec<(&str, String)> = iface
        .nat_cidr4()
        .iter()
        .map(|cidr| ("iptables", cidr.to_string()))
        .chain(iface.nat_cidr6().iter().map(|cidr| ("ip6tables", cidr.to_string())))
        .collect();
    if destinations.is_empty() {
        return;
    }

    output.push('\n');
    output.push_str("# Firewall: NAT the following traffic coming from the VPN\n");
    for (table, cidr) in &destinations {
        let _ = writeln!(
            output,
            "PostUp = {table} -t nat -I POSTROUTING -o {nat} -d {cidr} -j MASQUERADE"
        );
    }
    output.push('\n');
    for (table, cidr) in &destinations {
        let _ = writeln!(
            output,
            "PreDown = {table} -t nat -D POSTROUTING -o {nat} -d {cidr} -j MASQUERADE"
        );
    }
}

/// Renders the configuration imported on the peer's own device.
///
/// The `[Peer]` section describes the server: traffic for both VPN pools
/// and every NAT destination is routed through the tunnel.
#[must_use]
pub fn peer_config(iface: &Interface, peer: &Peer) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "{HEADER}");
    output.push('\n');
    let _ = writeln!(output, "# Peer \"{}\"", peer.name());
    output.push_str("[Interface]\n");
    let _ = writeln!(output, "PrivateKey = {}", peer.private_key());
    let _ = writeln!(output, "Address = {}", peer.cidr4());
    let _ = writeln!(output, "Address = {}", peer.cidr6());
    if !iface.dns().is_empty() {
        let servers: Vec<String> = iface.dns().iter().map(ToString::to_string).collect();
        let _ = writeln!(output, "DNS = {}", servers.join(", "));
    }

    let mut allowed4 = vec![iface.vpn_cidr4().to_string()];
    let mut allowed6 = vec![iface.vpn_cidr6().to_string()];
    if iface.nat_iface().is_some() {
        allowed4.extend(iface.nat_cidr4().iter().map(ToString::to_string));
        allowed6.extend(iface.nat_cidr6().iter().map(ToString::to_string));
    }

    output.push('\n');
    output.push_str("[Peer]\n");
    let _ = writeln!(output, "PublicKey = {}", iface.public_key());
    let _ = writeln!(output, "PresharedKey = {}", peer.preshared_key());
    let _ = writeln!(output, "AllowedIPs = {}", allowed4.join(", "));
    let _ = writeln!(output, "AllowedIPs = {}", allowed6.join(", "));
    let _ = writeln!(output, "Endpoint = {}", endpoint(iface.host(), iface.port()));
    output.push_str("# Keeps peers behind NAT reachable\n");
    let _ = writeln!(output, "PersistentKeepalive = {PERSISTENT_KEEPALIVE}");

    output
}

/// `host:port`, bracketing IPv6 literals.
fn endpoint(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::InterfaceAttribute;
    use crate::test_support::FakeKeys;

    fn wg0() -> (FakeKeys, Interface) {
        let keys = FakeKeys::default();
        let iface = Interface::create(
            &keys,
            "wg0",
            "10.8.0.0/24".parse().expect("v4"),
            "fd00:8::/64".parse().expect("v6"),
            "vpn.example.com",
            51820,
        )
        .expect("create");
        (keys, iface)
    }

    #[test]
    fn interface_without_nat_or_peers() {
        let (_, iface) = wg0();
        let expected = "\
# Generated by wgup

[Interface]
PrivateKey = private-1
Address = 10.8.0.1/24
Address = fd00:8::1/64
ListenPort = 51820

# Firewall: Allow traffic flow within VPN interface
PostUp = iptables -I FORWARD -i wg0 -o wg0 -j ACCEPT
PostUp = ip6tables -I FORWARD -i wg0 -o wg0 -j ACCEPT

PreDown = iptables -D FORWARD -i wg0 -o wg0 -j ACCEPT
PreDown = ip6tables -D FORWARD -i wg0 -o wg0 -j ACCEPT
";
        assert_eq!(interface_config(&iface), expected);
    }

    #[test]
    fn interface_with_nat_and_peer() {
        let (keys, mut iface) = wg0();
        iface.set_nat_iface(Some("eth0".into())).expect("nat");
        iface
            .add_nat_cidr4("192.168.1.0/24".parse().expect("v4"))
            .expect("add");
        iface
            .add_nat_cidr6("fd10::/48".parse().expect("v6"))
            .expect("add");
        iface.create_peer(&keys, "alice", None, None).expect("peer");

        let config = interface_config(&iface);
        let expected_tail = "\
# Firewall: Allow traffic flow between VPN interface and NAT interface
PostUp = iptables -I FORWARD -i wg0 -o eth0 -j ACCEPT
PostUp = ip6tables -I FORWARD -i wg0 -o eth0 -j ACCEPT
PostUp = iptables -I FORWARD -i eth0 -o wg0 -j ACCEPT
PostUp = ip6tables -I FORWARD -i eth0 -o wg0 -j ACCEPT

PreDown = iptables -D FORWARD -i wg0 -o eth0 -j ACCEPT
PreDown = ip6tables -D FORWARD -i wg0 -o eth0 -j ACCEPT
PreDown = iptables -D FORWARD -i eth0 -o wg0 -j ACCEPT
PreDown = ip6tables -D FORWARD -i eth0 -o wg0 -j ACCEPT

# Firewall: NAT the following traffic coming from the VPN
PostUp = iptables -t nat -I POSTROUTING -o eth0 -d 192.168.1.0/24 -j MASQUERADE
PostUp = ip6tables -t nat -I POSTROUTING -o eth0 -d fd10::/48 -j MASQUERADE

PreDown = iptables -t nat -D POSTROUTING -o eth0 -d 192.168.1.0/24 -j MASQUERADE
PreDown = ip6tables -t nat -D POSTROUTING -o eth0 -d fd10::/48 -j MASQUERADE

# Peer \"alice\"
[Peer]
PublicKey = public(private-2)
PresharedKey = psk-3
AllowedIPs = 10.8.0.2/32
AllowedIPs = fd00:8::2/128
";
        assert!(config.ends_with(expected_tail), "{config}");
    }

    #[test]
    fn nat_without_destinations_has_no_masquerade_block() {
        let (_, mut iface) = wg0();
        iface.set_nat_iface(Some("eth0".into())).expect("nat");
        let config = interface_config(&iface);
        assert!(config.contains("-i wg0 -o eth0"));
        assert!(!config.contains("MASQUERADE"));
    }

    #[test]
    fn peer_config_routes_pools_and_nat_destinations() {
        let (keys, mut iface) = wg0();
        iface.set_nat_iface(Some("eth0".into())).expect("nat");
        iface
            .add_nat_cidr4("192.168.1.0/24".parse().expect("v4"))
            .expect("add");
        iface
            .add_nat_cidr4("10.0.0.0/8".parse().expect("v4"))
            .expect("add");
        let peer = iface
            .create_peer(&keys, "alice", None, None)
            .expect("peer")
            .clone();

        let expected = "\
# Generated by wgup

# Peer \"alice\"
[Interface]
PrivateKey = private-2
Address = 10.8.0.2/32
Address = fd00:8::2/128

[Peer]
PublicKey = public(private-1)
PresharedKey = psk-3
AllowedIPs = 10.8.0.0/24, 10.0.0.0/8, 192.168.1.0/24
AllowedIPs = fd00:8::/64
Endpoint = vpn.example.com:51820
# Keeps peers behind NAT reachable
PersistentKeepalive = 10
";
        assert_eq!(peer_config(&iface, &peer), expected);
    }

    #[test]
    fn peer_config_includes_dns() {
        let (keys, mut iface) = wg0();
        iface
            .apply(InterfaceAttribute::parse("dns", "1.1.1.1, 2606:4700:4700::1111").expect("dns"))
            .expect("apply");
        let peer = iface.create_peer(&keys, "alice", None, None).expect("peer").clone();
        assert!(peer_config(&iface, &peer).contains("DNS = 1.1.1.1, 2606:4700:4700::1111\n"));
        assert!(!interface_config(&iface).contains("DNS"));
    }

    #[test]
    fn ipv6_endpoint_is_bracketed() {
        let (keys, mut iface) = wg0();
        iface
            .apply(InterfaceAttribute::Host("2001:db8::1".into()))
            .expect("host");
        let peer = iface.create_peer(&keys, "alice", None, None).expect("peer").clone();
        assert!(peer_config(&iface, &peer).contains("Endpoint = [2001:db8::1]:51820\n"));
    }

    #[test]
    fn rendering_is_idempotent() {
        let (keys, mut iface) = wg0();
        for name in ["carol", "alice", "bob"] {
            iface.create_peer(&keys, name, None, None).expect("peer");
        }
        assert_eq!(interface_config(&iface), interface_config(&iface));
        let peer = iface.peer("bob").expect("bob");
        assert_eq!(peer_config(&iface, peer), peer_config(&iface, peer));

        let config = interface_config(&iface);
        let alice = config.find("# Peer \"alice\"").expect("alice");
        let bob = config.find("# Peer \"bob\"").expect("bob");
        let carol = config.find("# Peer \"carol\"").expect("carol");
        assert!(alice < bob && bob < carol);
    }
}
