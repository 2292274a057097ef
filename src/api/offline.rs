//! Keyword responder used when no paid backend is configured

use super::{last_user_message, GatewayResponse, Message, ProviderAdapter, TokenUsage};
use crate::config::ProviderProfile;
use async_trait::async_trait;
use tracing::debug;

const EMERGENCY_TERMS: &[&str] = &[
    "urgence",
    "urgent",
    "grave",
    "samu",
    "thoracique",
    "poitrine",
    "inconscient",
    "respire plus",
    "étouff",
    "avc",
    "hémorragie",
    "suicid",
    "emergency",
    "chest pain",
];
const MEDICATION_TERMS: &[&str] = &[
    "médicament",
    "medicament",
    "traitement",
    "prescription",
    "ordonnance",
    "interaction",
    "posologie",
];
const FEVER_TERMS: &[&str] = &["fièvre", "fievre", "température", "temperature"];
const PAIN_TERMS: &[&str] = &["douleur", "souffr"];

const DISCLAIMER: &str = "\n\n---\n_Mode basique activé. Pour des réponses plus précises, \
configurez une clé API dans Paramètres._";

/// Category picked for a user message, tested in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Topic {
    Emergency,
    Medication,
    Fever,
    Pain,
    Greeting,
}

impl Topic {
    fn classify(text: &str) -> Self {
        let text = text.to_lowercase();
        let words: Vec<&str> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        let has = |terms: &[&str]| terms.iter().any(|t| mentions(&text, &words, t));

        if has(EMERGENCY_TERMS) {
            Topic::Emergency
        } else if has(MEDICATION_TERMS) {
            Topic::Medication
        } else if has(FEVER_TERMS) {
            Topic::Fever
        } else if has(PAIN_TERMS) || words.contains(&"mal") {
            Topic::Pain
        } else {
            Topic::Greeting
        }
    }
}

/// Phrases match anywhere; single terms only at the start of a word
fn mentions(text: &str, words: &[&str], term: &str) -> bool {
    if term.contains(' ') {
        text.contains(term)
    } else {
        words.iter().any(|w| w.starts_with(term))
    }
}

fn pain_reply(text: &str) -> String {
    let text = text.to_lowercase();
    let mut reply = String::from("🩺 **Symptôme détecté**\n\n");

    if text.contains("tête") || text.contains("tete") {
        reply.push_str(
            "Vous mentionnez une douleur à la tête. Quelques conseils :\n\n\
             - Reposez-vous dans un endroit calme et sombre\n\
             - Hydratez-vous bien\n\
             - Évitez les écrans\n\n\
             ⚠️ Si la douleur persiste plus de 48h ou s'aggrave, consultez un médecin.",
        );
    } else if text.contains("ventre") || text.contains("abdomen") {
        reply.push_str(
            "Vous mentionnez une douleur abdominale. Quelques recommandations :\n\n\
             - Évitez les aliments gras ou épicés\n\
             - Privilégiez une alimentation légère\n\
             - Reposez-vous\n\n\
             🚨 Si la douleur est intense ou persistante, consultez rapidement.",
        );
    } else {
        reply.push_str(
            "Vous mentionnez une douleur. Il est important de :\n\n\
             - Noter l'intensité (échelle de 1 à 10)\n\
             - Observer la fréquence et la durée\n\
             - Consulter si la douleur persiste",
        );
    }

    reply
}

fn reply_for(text: &str) -> String {
    let body = match Topic::classify(text) {
        Topic::Emergency => "🚨 **URGENCE**\n\n\
             **APPELEZ IMMÉDIATEMENT :**\n\
             - 🚑 **15** (SAMU)\n\
             - 🚨 **112** (numéro d'urgence européen)\n\n\
             Ne perdez pas de temps avec cette application en cas d'urgence vitale."
            .to_string(),
        Topic::Medication => "💊 **Question sur les médicaments**\n\n\
             ⚠️ **Je ne suis pas un médecin** et ne peux pas prescrire de médicaments \
             ni confirmer une interaction.\n\n\
             Pour toute question sur vos traitements :\n\
             - Consultez votre médecin traitant\n\
             - Ou demandez conseil à votre pharmacien"
            .to_string(),
        Topic::Fever => "🌡️ **Fièvre détectée**\n\n\
             Conseils pour gérer la fièvre :\n\n\
             - Reposez-vous\n\
             - Buvez beaucoup d'eau\n\
             - Prenez du paracétamol si nécessaire\n\
             - Surveillez votre température\n\n\
             ⚠️ Consultez si elle dépasse 39°C ou persiste plus de 3 jours."
            .to_string(),
        Topic::Pain => pain_reply(text),
        Topic::Greeting => "👋 **Bonjour**\n\n\
             Je suis un assistant santé basique (mode sans API).\n\n\
             💡 **Ce que je peux faire :**\n\
             - Répondre à des questions simples\n\
             - Donner des conseils généraux\n\
             - Vous orienter vers les bons professionnels\n\n\
             ⚠️ Je ne remplace pas un médecin. Pour un diagnostic ou un traitement, \
             consultez toujours un professionnel de santé."
            .to_string(),
    };

    format!("{}{}", body, DISCLAIMER)
}

/// Classifies the last user message; never touches the network
pub struct OfflineAdapter;

#[async_trait]
impl ProviderAdapter for OfflineAdapter {
    async fn invoke(&self, _profile: &ProviderProfile, messages: &[Message]) -> GatewayResponse {
        let text = last_user_message(messages)
            .map(|m| m.content.as_str())
            .unwrap_or("");

        debug!("Using basic mode (keyword analysis)");
        GatewayResponse::success(reply_for(text), Some(TokenUsage::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ProviderKind;

    #[test]
    fn test_classification_order() {
        assert_eq!(Topic::classify("douleur thoracique"), Topic::Emergency);
        assert_eq!(Topic::classify("C'est GRAVE docteur"), Topic::Emergency);
        assert_eq!(
            Topic::classify("quel médicament contre la fièvre ?"),
            Topic::Medication
        );
        assert_eq!(Topic::classify("j'ai de la fièvre et mal au dos"), Topic::Fever);
        assert_eq!(Topic::classify("j'ai mal à la tête"), Topic::Pain);
        assert_eq!(Topic::classify("bonjour"), Topic::Greeting);
        assert_eq!(Topic::classify(""), Topic::Greeting);
    }

    #[test]
    fn test_terms_match_at_word_start() {
        assert_eq!(Topic::classify("mon mal de tête s'aggrave"), Topic::Pain);
        assert!(reply_for("mon mal de tête s'aggrave").contains("douleur à la tête"));
        assert_eq!(Topic::classify("c'est très grave"), Topic::Emergency);
        assert_eq!(Topic::classify("j'étouffe"), Topic::Emergency);
        assert_eq!(Topic::classify("pensées suicidaires"), Topic::Emergency);
        assert_eq!(Topic::classify("il ne respire plus"), Topic::Emergency);
        assert_eq!(Topic::classify("mes médicaments du soir"), Topic::Medication);
        assert_eq!(Topic::classify("je souffre du dos"), Topic::Pain);
    }

    #[test]
    fn test_pain_sub_cases() {
        assert!(reply_for("douleur à la tête").contains("douleur à la tête"));
        assert!(reply_for("mal au ventre").contains("abdominale"));
        assert!(reply_for("douleur au genou").contains("intensité"));
    }

    #[tokio::test]
    async fn test_emergency_reply_directs_to_emergency_services() {
        let profile = ProviderProfile::new(ProviderKind::Offline, "basic");
        let response = OfflineAdapter
            .invoke(&profile, &[Message::user("douleur thoracique")])
            .await;

        assert!(response.success);
        let content = response.content.unwrap();
        assert!(content.contains("15"));
        assert!(content.contains("112"));
        assert!(content.contains("APPELEZ"));
        assert_eq!(response.usage, Some(TokenUsage::default()));
    }

    #[tokio::test]
    async fn test_uses_last_user_message() {
        let profile = ProviderProfile::new(ProviderKind::Offline, "basic");
        let response = OfflineAdapter
            .invoke(
                &profile,
                &[
                    Message::system("contexte"),
                    Message::user("urgence"),
                    Message::assistant("..."),
                    Message::user("j'ai de la fièvre"),
                ],
            )
            .await;

        assert!(response.content.unwrap().contains("Fièvre détectée"));
    }

    #[tokio::test]
    async fn test_no_user_message_still_succeeds() {
        let profile = ProviderProfile::new(ProviderKind::Offline, "basic");
        let response = OfflineAdapter.invoke(&profile, &[]).await;

        assert!(response.success);
        assert!(response.content.unwrap().contains("Bonjour"));
    }
}
