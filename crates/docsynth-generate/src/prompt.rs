use crate::capability::BatchRequest;

/// Build the entity generation prompt for one batch call.
pub fn entity_prompt(request: &BatchRequest) -> String {
    let rules = &request.rules;
    let language = &rules.language_name;
    let domains = rules
        .email_domains
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    let mut prompt = format!(
        "Create realistic business data for: {document_type}\n\
         \n\
         ABSOLUTE REQUIREMENT: generate EXACTLY {count} data records.\n\
         \n\
         MANDATORY FIELD STRUCTURE:\n\
         - Each record MUST have ALL {field_count} fields: {fields}\n\
         - Use these field names exactly as keys\n\
         - NO missing fields, NO extra fields, NO null or empty values\n\
         - ALL text content must be written in {language}\n\
         \n\
         Regional conventions ({locale}):\n\
         - Dates use the {date_pattern} format\n\
         - Email addresses use domains such as {domains}\n\
         - Person names are written as {name_order}\n\
         - Legal references cite: {legal}\n\
         \n\
         Data requirements:\n\
         - Company names, people and addresses must sound real for {language}-speaking regions\n\
         - Amounts carry the currency symbol customary for the region\n\
         - Every record must be unique; do not repeat a record or reuse a template\n",
        document_type = request.document_type,
        count = request.count,
        field_count = request.entity_fields.len(),
        fields = request.entity_fields.join(", "),
        locale = rules.locale_code,
        date_pattern = rules.date_format_style.pattern(),
        name_order = rules.name_style.describe(),
        legal = rules.legal_reference_text,
    );

    if let Some(examples) = request.seed_examples.as_ref().filter(|map| !map.is_empty()) {
        prompt.push_str("\nExample values, for style only (do not copy them):\n");
        for (field, value) in examples {
            prompt.push_str(&format!("- {field}: {value}\n"));
        }
    }

    prompt.push_str(&format!(
        "\nReturn ONLY a JSON array with EXACTLY {} objects, no commentary or formatting.",
        request.count
    ));
    prompt
}

/// Prompt asking a vision model to describe a reference document.
pub fn analysis_prompt() -> &'static str {
    "Analyze this document image and extract:\n\
     1. The document type\n\
     2. The document language, as a short locale code (for example en, de, th)\n\
     3. Entities such as names, addresses, dates and amounts\n\
     \n\
     Write every extracted value in the same language as the document.\n\
     \n\
     Return the result as JSON:\n\
     {\n\
       \"document_type\": \"type in the detected language\",\n\
       \"detected_language\": \"locale code\",\n\
       \"confidence\": \"high | medium | low\",\n\
       \"extracted_entities\": {\"field name\": \"example value\"}\n\
     }\n\
     \n\
     Return ONLY the JSON, no explanations."
}
