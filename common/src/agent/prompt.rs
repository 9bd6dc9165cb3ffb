use crate::entities::dates::DateRange;
use crate::schema::SchemaDescriptor;

pub fn synthesis_system_prompt(namespace: &str) -> String {
    format!(
        "Você é um assistente SQL para PostgreSQL. \
         Gere apenas uma única consulta SELECT válida, sem explicações e sem markdown. \
         Sempre qualifique as tabelas com o schema '{ns}', no formato \"{ns}\".\"tabela\". \
         Use aspas duplas em todos os identificadores. \
         Para perguntas de contagem (quantos, quantas, total) use COUNT(*). \
         Em filtros de data informe sempre o ano e inclua o último dia até 23:59:59.",
        ns = namespace
    )
}

pub fn build_synthesis_prompt(
    question: &str,
    schema: &SchemaDescriptor,
    dates: Option<&DateRange>,
) -> String {
    let mut prompt = format!(
        "Aqui está o esquema do banco:\n{}\n\nTransforme a seguinte solicitação em SQL: {}",
        schema.describe(),
        question.trim()
    );

    if let Some(range) = dates {
        prompt.push_str(&format!(
            "\nConsidere o período entre {} (inclusive).",
            range
        ));
    }

    prompt
}

pub const RENDER_SYSTEM_PROMPT: &str =
    "Você transforma resultados de consultas em respostas claras e curtas, em português, \
     para usuários sem conhecimento técnico. \
     Nunca mencione SQL, consultas, tabelas, colunas ou bancos de dados.";

pub fn build_list_render_prompt(question: &str, values: &str) -> String {
    format!(
        "Pergunta: {}\nResultados: {}\n\nResponda à pergunta usando esses resultados.",
        question.trim(),
        values
    )
}

pub fn build_scalar_render_prompt(question: &str, literal: &str) -> String {
    format!(
        "Pergunta: {}\nValor encontrado: {}\n\nResponda em uma frase que contenha exatamente o valor {}.",
        question.trim(),
        literal,
        literal
    )
}
