//! Immutable FAQ content: keyword entries, topic triggers and default replies.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Reply for empty or whitespace-only questions.
pub const EMPTY_QUERY_PROMPT: &str = "Posez-moi une question sur BBC School !";

/// A keyword phrase and its canned response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub keyword_phrase: String,
    pub response: String,
}

impl KnowledgeEntry {
    pub fn new(keyword_phrase: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            keyword_phrase: keyword_phrase.into(),
            response: response.into(),
        }
    }
}

/// Fires when any of its tokens occurs as a substring of the normalized query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicTrigger {
    pub trigger_tokens: Vec<String>,
    pub response: String,
}

impl TopicTrigger {
    pub fn new<I, S>(trigger_tokens: I, response: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            trigger_tokens: trigger_tokens.into_iter().map(Into::into).collect(),
            response: response.into(),
        }
    }

    /// True if any trigger token is contained in `normalized_query`.
    pub fn fires_on(&self, normalized_query: &str) -> bool {
        self.trigger_tokens
            .iter()
            .any(|token| normalized_query.contains(token.as_str()))
    }
}

/// The whole responder content. Built once at start-up and never mutated.
///
/// Entry order is significant: when two entries reach the same best score the
/// earlier one wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    pub entries: Vec<KnowledgeEntry>,
    pub topics: Vec<TopicTrigger>,
    pub defaults: Vec<String>,
    #[serde(default = "default_empty_prompt")]
    pub empty_prompt: String,
}

fn default_empty_prompt() -> String {
    EMPTY_QUERY_PROMPT.to_string()
}

impl KnowledgeBase {
    /// Loads a knowledge base from a JSON file. On any error (missing file,
    /// bad JSON, no default replies) falls back to [`KnowledgeBase::builtin`].
    pub fn load_json_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let raw = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(target: "bbc::chatbot", path = %path.display(), error = %e, "Knowledge file unreadable, using built-in FAQ");
                return Self::builtin();
            }
        };
        match serde_json::from_str::<KnowledgeBase>(&raw) {
            Ok(kb) if kb.defaults.is_empty() => {
                tracing::warn!(target: "bbc::chatbot", "Knowledge file has no default replies, using built-in FAQ");
                Self::builtin()
            }
            Ok(kb) => match kb.blank_reply() {
                Some(field) => {
                    tracing::warn!(target: "bbc::chatbot", field, "Knowledge file has a blank reply, using built-in FAQ");
                    Self::builtin()
                }
                None => {
                    tracing::info!(
                        target: "bbc::chatbot",
                        entries = kb.entries.len(),
                        topics = kb.topics.len(),
                        "Loaded knowledge base from {}",
                        path.display()
                    );
                    kb
                }
            },
            Err(e) => {
                tracing::warn!(target: "bbc::chatbot", error = %e, "Knowledge file is not valid JSON, using built-in FAQ");
                Self::builtin()
            }
        }
    }

    /// First field holding an empty or whitespace-only reply.
    fn blank_reply(&self) -> Option<&'static str> {
        let blank = |s: &str| s.trim().is_empty();
        if blank(&self.empty_prompt) {
            Some("empty_prompt")
        } else if self.entries.iter().any(|e| blank(&e.response)) {
            Some("entries")
        } else if self.topics.iter().any(|t| blank(&t.response)) {
            Some("topics")
        } else if self.defaults.iter().any(|d| blank(d)) {
            Some("defaults")
        } else {
            None
        }
    }

    /// The school's FAQ as shipped.
    pub fn builtin() -> Self {
        let entries = vec![
            KnowledgeEntry::new(
                "bonjour",
                "Bonjour ! Bienvenue chez BBC School Algeria. Je suis votre assistant IA pour la formation Intelligence Artificielle adaptée aux enseignants. Comment puis-je vous aider aujourd'hui ?",
            ),
            // Listed before "formation": a question naming both is a pricing question.
            KnowledgeEntry::new(
                "tarif",
                "Nos tarifs sont compétitifs : Formation Débutant 45.000 DZD | Intermédiaire 55.000 DZD | Avancé 65.000 DZD. Possibilités de paiement échelonné sur 3 mois sans frais.",
            ),
            KnowledgeEntry::new(
                "formation",
                "BBC School propose une formation certifiante en IA spécifiquement conçue pour les enseignants algériens. Programme de 6 semaines avec certification officielle reconnue.",
            ),
            KnowledgeEntry::new(
                "horaire",
                "Les sessions BBC School se déroulent du lundi au vendredi, de 09h00 à 17h00 avec pause déjeuner de 12h30 à 14h00. Format hybride disponible (présentiel + en ligne).",
            ),
            KnowledgeEntry::new(
                "inscription",
                "L'inscription se fait directement via le formulaire en ligne. Vous recevrez immédiatement un email de confirmation avec votre ID unique et le programme détaillé de la formation.",
            ),
            KnowledgeEntry::new(
                "contact",
                "Contactez-nous facilement : 📧 contact@bbcschool.dz | 📞 +213 661 12 34 56 | 📍 Centre-ville d'Alger, près de la poste centrale (heures d'ouverture 8h-18h).",
            ),
            KnowledgeEntry::new(
                "durée",
                "Durée complète : 6 semaines intensives (120 heures totales - 24 sessions de 5 heures). Certification BBC School Algeria incluse et reconnue par l'éducation nationale.",
            ),
            KnowledgeEntry::new(
                "certificat",
                "Absolument ! Toutes nos formations délivrents un certificat officiel BBC School Algeria, valable pour vos promotions, avancements de carrière et heures de formation continue.",
            ),
            KnowledgeEntry::new(
                "en ligne",
                "Nous proposons un format hybride optimal : 60% présentiel à Alger pour les travaux pratiques, 40% en ligne via notre plateforme sécurisée Zoom + Moodle pour plus de flexibilité.",
            ),
            KnowledgeEntry::new(
                "prérequis",
                "Aucun prérequis technique requis ! Il suffit d'avoir un ordinateur moderne (Windows 10+, Mac OS, ou Linux), 8 Go de RAM minimum, et une connexion internet stable (4G ou fibre).",
            ),
            KnowledgeEntry::new(
                "contenu",
                "Programme complet : Introduction à Python pour l'IA, Machine Learning pratique, Création de chatbots éducatifs, Traitement automatique du langage (NLP), Outils IA pour l'enseignement, Éthique et réglementation IA.",
            ),
            KnowledgeEntry::new(
                "financement",
                "Plusieurs options : paiement comptant, paiement en 3 fois sans frais, financement via les établissements scolaires, ou bourses partielles pour les enseignants prioritaires.",
            ),
        ];

        let topics = vec![
            TopicTrigger::new(
                ["prix", "coût", "budget", "financement", "tarif"],
                "Les formations BBC School IA sont très accessibles financièrement :\n\n💰 **Tarifs** :\n• Débutant : 45.000 DZD\n• Intermédiaire : 55.000 DZD\n• Avancé : 65.000 DZD\n\n💳 **Options de paiement** :\n• Paiement comptant (remise 5%)\n• 3 × sans frais\n• Financement établissement\n• Bourses enseignants prioritaires\n\nContactez-nous pour un devis personnalisé ! 📧 contact@bbcschool.dz",
            ),
            TopicTrigger::new(
                ["email", "confirmation", "reçu", "mail"],
                "Votre email de confirmation BBC School contient :\n\n📋 **ID unique** de votre inscription\n📅 Programme détaillé et dates de session\n💰 Modalités de paiement et facturation\n📍 Adresse et horaires des cours\n📧 Coordonnées complètes du support\n\nL'email arrive normalement dans les 5 minutes. Vérifiez votre dossier spam si nécessaire.",
            ),
        ];

        let defaults = vec![
            "Je suis l'assistant IA officiel de BBC School Algeria, spécialisé dans la formation certifiante Intelligence Artificielle pour enseignants. Posez-moi des questions précises sur :\n\n• Le programme de formation\n• Les tarifs et financements\n• Les modalités d'inscription\n• Les horaires et durée\n• Le certificat délivré\n• Les prérequis techniques\n\nOu contactez-nous directement au +213 661 12 34 56 !".to_string(),
            "BBC School est leader en formation IA éducative en Algérie. Notre programme de 6 semaines vous formera à utiliser l'IA dans vos cours : chatbots, analyse de données élèves, correction automatique, et outils pédagogiques innovants. Certification officielle incluse !".to_string(),
            "Pour toute question spécifique sur votre inscription ou la formation, vous pouvez aussi nous joindre :\n\n📧 contact@bbcschool.dz\n📞 +213 661 12 34 56\n🕒 Lundi-Vendredi 8h-18h\n📍 Centre-ville d'Alger".to_string(),
        ];

        Self {
            entries,
            topics,
            defaults,
            empty_prompt: default_empty_prompt(),
        }
    }
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::builtin()
    }
}
