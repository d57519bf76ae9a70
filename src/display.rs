//! Turn the bound address into something a human can use: a URI and a
//! QR code scannable from another device.

use std::net::{IpAddr, Ipv4Addr};

use qrcode::render::unicode;
use qrcode::QrCode;
use tracing::debug;

use crate::error::{Error, Result};

/// Presentation of a bound server: the download URI and its QR rendering.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub uri: String,
    pub qr: String,
}

/// Choose the host part of the displayed URI.
///
/// An explicitly requested display address always wins. Binding to
/// `0.0.0.0` or loopback produces an address other devices cannot reach,
/// so the machine's LAN address is substituted in that case.
pub fn pick_host(preferred: Option<Ipv4Addr>, bound: IpAddr) -> Result<IpAddr> {
    if let Some(host) = preferred {
        return Ok(IpAddr::V4(host));
    }

    if bound.is_unspecified() || bound.is_loopback() {
        debug!(%bound, "looking up LAN address for a non-routable bind address");

        return local_ip_address::local_ip().map_err(|err| Error::Display {
            message: err.to_string(),
        });
    }

    Ok(bound)
}

/// Format the download URI and render it as a QR code.
pub fn connection_info(host: IpAddr, port: u16, basename: &str) -> Result<ConnectionInfo> {
    let uri = format!("http://{host}:{port}/{basename}");

    debug!(%uri, "formatted uri");

    let code = QrCode::new(uri.as_bytes()).map_err(|err| Error::Display {
        message: err.to_string(),
    })?;
    let qr = code
        .render::<unicode::Dense1x2>()
        .dark_color(unicode::Dense1x2::Light)
        .light_color(unicode::Dense1x2::Dark)
        .quiet_zone(true)
        .build();

    Ok(ConnectionInfo { uri, qr })
}
