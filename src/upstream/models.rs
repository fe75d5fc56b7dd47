//! Response shapes of the upstream services. Every metric is optional here; turning
//! absent or invalid values into local defaults is the synchronizer's job.

use serde::{Deserialize, Serialize};

/// Member of an upstream collection listing. Only the id is read.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct UpstreamEntityRef {
    #[serde(alias = "idArtista", alias = "idContenido", alias = "idcontenido")]
    pub id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct UpstreamArtist {
    #[serde(default, alias = "oyentes")]
    pub listeners: Option<f64>,
    #[serde(default, alias = "valoracion")]
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct UpstreamContent {
    #[serde(default, alias = "numventas")]
    pub sales: Option<f64>,
    #[serde(default, alias = "valoracion")]
    pub rating: Option<f64>,
    #[serde(default, alias = "esalbum")]
    pub is_album: Option<bool>,
    #[serde(default, alias = "esnovedad")]
    pub is_new: Option<bool>,
    #[serde(default, alias = "genero")]
    pub genre: Option<UpstreamGenre>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct UpstreamGenre {
    #[serde(default, alias = "nombre")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct UpstreamComment {
    #[serde(default, alias = "comentario")]
    pub comment: Option<String>,
}

impl UpstreamComment {
    pub fn has_text(&self) -> bool {
        self.comment
            .as_deref()
            .is_some_and(|text| !text.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct UpstreamCommunity {
    #[serde(rename = "idComunidad", alias = "id")]
    pub id: i64,
    #[serde(default, rename = "numPublicaciones", alias = "posts")]
    pub posts: Option<f64>,
    #[serde(default, rename = "numUsuarios", alias = "members")]
    pub members: Option<f64>,
}
