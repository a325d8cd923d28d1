pub fn build_triplet_prompt(chunk_text: &str, max_triplets: usize) -> String {
    format!(
        r#"Extract knowledge triplets from the following text.

INSTRUCTIONS:
1. Identify factual (subject, predicate, object) relationships
2. Output up to {} triplets, one per line
3. Use exactly this format: (subject; predicate; object)
4. Output ONLY the triplet lines, no explanations

RULES:
- Subjects and objects are named entities or concepts from the text
- Predicates should be short verb phrases: "founded", "is located in", "uses"
- Do not invent facts that are not stated in the text
- If the text contains no extractable facts, output nothing

TEXT:
{}

TRIPLETS:"#,
        max_triplets, chunk_text
    )
}
