//! Erreurs du flux de résultats.

use thiserror::Error;

/// Échec d'une récupération du flux. Aucune variante n'est fatale : le cycle est
/// simplement abandonné et le prochain tick retente.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Requête impossible (connexion, DNS, TLS).
    #[error("erreur de transport : {message}")]
    Transport { message: String },

    /// Pas de réponse dans le délai imparti.
    #[error("délai dépassé")]
    Timeout,

    /// Réponse HTTP non 2xx.
    #[error("statut HTTP {0}")]
    Status(u16),

    /// Corps illisible ou JSON inattendu.
    #[error("réponse malformée : {message}")]
    Malformed { message: String },

    /// Liste de tirages vide.
    #[error("page vide")]
    EmptyPage,

    /// Tirage avec une période ou un numéro invalide.
    #[error("tirage invalide : {message}")]
    InvalidRecord { message: String },
}

impl FeedError {
    /// Vrai si un nouvel essai au prochain cycle a des chances de réussir.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FeedError::Transport { .. }
                | FeedError::Timeout
                | FeedError::Status(_)
                | FeedError::EmptyPage
        )
    }
}

impl From<reqwest::Error> for FeedError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FeedError::Timeout
        } else if let Some(status) = e.status() {
            FeedError::Status(status.as_u16())
        } else {
            FeedError::Transport { message: e.to_string() }
        }
    }
}
