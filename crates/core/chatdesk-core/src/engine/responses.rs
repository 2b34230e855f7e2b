//! Canned assistant answers

use super::keywords::Topic;

/// Answer for a matched topic
pub fn topic_response(topic: Topic) -> &'static str {
    match topic {
        Topic::App => APP_DEVELOPMENT,
        Topic::Web => WEB_DEVELOPMENT,
        Topic::System => SYSTEM_DEVELOPMENT,
        Topic::Pricing => PRICING,
        Topic::Process => PROCESS,
        Topic::TechStack => TECH_STACK,
        Topic::Company => COMPANY,
        Topic::Timeline => TIMELINE,
    }
}

pub(crate) const GREETING: &str =
    "Olá! 😊 É um prazer conversar com você! Como posso ajudar com nossos serviços de desenvolvimento?";

pub(crate) const THANKS: &str =
    "De nada! Fico feliz em ajudar. 😊 Há mais alguma coisa sobre nossos serviços que gostaria de saber?";

pub(crate) const FAREWELL: &str =
    "Obrigado pela conversa! Se tiver mais dúvidas sobre desenvolvimento, estarei aqui. Tenha um ótimo dia! 🌟";

/// Technical-question answer quoting the start of the question
pub fn technical_response(question: &str) -> String {
    let quoted: String = question.chars().take(50).collect();
    format!(
        "🤔 **Pergunta Técnica Interessante**\n\n\
         Sua pergunta sobre \"{}...\" é bastante específica.\n\n\
         Para garantir uma resposta precisa e detalhada, recomendo:\n\n\
         1. **Conversar com nosso especialista técnico** - posso conectar você agora mesmo\n\
         2. **Agendar uma call técnica** - sem compromisso\n\
         3. **Enviar sua pergunta por email** para nossa equipe analisar\n\n\
         O que prefere? Posso transferir para um atendente humano que terá todo o conhecimento para ajudar!",
        quoted
    )
}

/// Catch-all answer echoing the visitor's text
pub fn generic_response(text: &str) -> String {
    format!(
        "🤖 **Assistente IA WP Web Soluções**\n\n\
         Entendi que você perguntou sobre: \"{}\"\n\n\
         Como sou um assistente focado em **desenvolvimento de software**, posso ajudar melhor com:\n\n\
         • Desenvolvimento de **apps, sites e sistemas**\n\
         • **Tecnologias** que utilizamos (Flutter, React, Python, etc.)\n\
         • **Processos** de desenvolvimento e prazos\n\
         • **Orçamentos** e investimentos\n\n\
         Se sua pergunta for sobre outros assuntos ou precisar de um atendimento mais específico, \
         posso conectar você com nosso time humano!\n\n\
         **Como posso auxiliar melhor você?**",
        text
    )
}

pub(crate) const APP_DEVELOPMENT: &str = "📱 **Desenvolvimento de Apps Mobile**

Desenvolvemos aplicativos **nativos e híbridos** para iOS e Android:

**🚀 Tecnologias:**
• Flutter (Cross-platform)
• React Native
• Swift (iOS nativo)
• Kotlin (Android nativo)

**💡 O que incluímos:**
• Design UI/UX personalizado
• Desenvolvimento completo
• Integração com APIs
• Publicação nas lojas
• Manutenção contínua

**⏱️ Tempo:** 2-4 meses
**💰 Investimento:** A partir de R$ 8.000

Tem um projeto específico em mente?";

pub(crate) const WEB_DEVELOPMENT: &str = "🌐 **Desenvolvimento Web**

Criamos **sites modernos e responsivos**:

**🎨 Tipos de sites:**
• Landing Pages (1-2 semanas)
• Sites Institucionais (3-6 semanas)
• E-commerce (4-8 semanas)
• Portfólios (2-4 semanas)

**⚡ Tecnologias:**
• HTML5/CSS3/JavaScript
• React.js / Vue.js
• WordPress (quando necessário)
• SEO otimizado

**💰 Investimento:** A partir de R$ 1.500

Qual tipo de site você precisa?";

pub(crate) const SYSTEM_DEVELOPMENT: &str = "💻 **Sistemas Web Sob Medida**

Desenvolvemos **sistemas completos** para automação empresarial:

**🛠️ Stack Tecnológica:**
• Frontend: React, Vue.js, TypeScript
• Backend: Python/FastAPI, Node.js
• Database: MongoDB, PostgreSQL
• Cloud: AWS, Google Cloud, Oracle

**📊 Funcionalidades Comuns:**
• Dashboards administrativos
• Relatórios em tempo real
• Sistema de usuários
• Integração com APIs externas

**⏱️ Tempo:** 2-5 meses
**💰 Investimento:** A partir de R$ 12.000

Para qual área você precisa do sistema?";

pub(crate) const PRICING: &str = "💰 **Informações de Investimento**

**Site Institucional:** R$ 1.500 - R$ 8.000
• Landing Page: R$ 1.500 - R$ 3.000
• Site Corporativo: R$ 3.500 - R$ 8.000

**Aplicativo Mobile:** R$ 8.000 - R$ 25.000+
• App Simples: R$ 8.000 - R$ 15.000
• App Complexo: R$ 15.000 - R$ 25.000+

**Sistema Web:** R$ 12.000 - R$ 50.000+
• Sistema Básico: R$ 12.000 - R$ 25.000
• Sistema Empresarial: R$ 25.000 - R$ 50.000+

**💎 Incluímos em todos os projetos:**
• Design UI/UX personalizado
• Desenvolvimento completo
• Testes e qualidade
• Deploy e implantação
• Suporte pós-entrega

Posso preparar uma estimativa personalizada?";

pub(crate) const PROCESS: &str = "🔄 **Nosso Processo de Desenvolvimento**

**1. Discovery (1-2 semanas)**
• Análise de requisitos
• Wireframes e protótipos
• Planejamento detalhado

**2. Design (2-3 semanas)**
• Design de interface
• Experiência do usuário
• Validação com cliente

**3. Desenvolvimento (varia)**
• Sprints de 2 semanas
• Entregas parciais
• Testes contínuos

**4. Entrega & Suporte**
• Deploy e implantação
• Treinamento
• Suporte pós-entrega

**🎯 Taxa de satisfação:** 95% dos clientes";

pub(crate) const TECH_STACK: &str = "🛠️ **Stack Tecnológica**

**Frontend:**
• React.js / Vue.js / TypeScript
• Flutter / React Native
• HTML5 / CSS3 / JavaScript

**Backend:**
• Python + FastAPI
• Node.js + Express
• PHP + Laravel

**Database:**
• MongoDB
• PostgreSQL
• MySQL

**Cloud & DevOps:**
• AWS / Google Cloud
• Docker
• CI/CD

Tem preferência por alguma tecnologia específica?";

pub(crate) const COMPANY: &str = "🏢 **WP Web Soluções**

Somos uma empresa especializada em **desenvolvimento de software** com foco em:

**💼 O que fazemos:**
• Desenvolvimento de aplicativos mobile
• Criação de sites e sistemas web
• Soluções com inteligência artificial
• Consultoria em tecnologia

**⭐ Diferenciais:**
• Metodologia ágil transparente
• Tecnologias modernas
• Suporte contínuo
• Mais de 50 projetos entregues

**📍 Localização:** Minas Gerais, MG - Brasil";

pub(crate) const TIMELINE: &str = "⏱️ **Prazos de Desenvolvimento**

**Landing Page:** 1-2 semanas
**Site Institucional:** 3-6 semanas
**E-commerce:** 4-8 semanas
**Aplicativo Mobile:** 2-4 meses
**Sistema Web:** 2-5 meses

**📅 Fatores que influenciam o prazo:**
• Complexidade do projeto
• Número de funcionalidades
• Integrações necessárias
• Revisões solicitadas

Qual tipo de projeto você tem em mente?";
