use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Canary island a user trades from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum Island {
    #[display("Gran Canaria")]
    #[serde(rename = "Gran Canaria")]
    GranCanaria,
    #[display("Tenerife")]
    Tenerife,
    #[display("Lanzarote")]
    Lanzarote,
    #[display("Fuerteventura")]
    Fuerteventura,
    #[display("La Palma")]
    #[serde(rename = "La Palma")]
    LaPalma,
    #[display("La Gomera")]
    #[serde(rename = "La Gomera")]
    LaGomera,
    #[display("El Hierro")]
    #[serde(rename = "El Hierro")]
    ElHierro,
}

impl Island {
    pub const ALL: [Island; 7] = [
        Island::GranCanaria,
        Island::Tenerife,
        Island::Lanzarote,
        Island::Fuerteventura,
        Island::LaPalma,
        Island::LaGomera,
        Island::ElHierro,
    ];
}

impl FromStr for Island {
    type Err = String;

    /// Case-insensitive match on the display name
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Island::ALL
            .into_iter()
            .find(|island| island.to_string().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown island: {wanted}"))
    }
}
