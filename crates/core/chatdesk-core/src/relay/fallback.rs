//! Simulated agent replies used when the relay is unavailable

use rand::seq::SliceRandom;

/// Canned "agent" answers
pub const FALLBACK_RESPONSES: [&str; 5] = [
    "Entendi sua mensagem! Pode me contar um pouco mais sobre seu projeto?",
    "Excelente pergunta! Para te dar a melhor orientação, qual é o objetivo principal do seu projeto?",
    "Perfeito! Estou analisando sua solicitação. Você tem algum prazo específico em mente?",
    "Obrigado pelas informações! Posso preparar uma proposta preliminar baseada no que você me contou.",
    "Entendi sua necessidade! Nossos especialistas já estão analisando o caso. Posso conectar você diretamente com nosso time técnico?",
];

/// One of [`FALLBACK_RESPONSES`], picked at random
pub fn pick_fallback_response() -> &'static str {
    FALLBACK_RESPONSES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(FALLBACK_RESPONSES[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_comes_from_fixed_set() {
        for _ in 0..50 {
            assert!(FALLBACK_RESPONSES.contains(&pick_fallback_response()));
        }
    }
}
