use tantivy::schema::{Field, IndexRecordOption, NumericOptions, Schema, TextFieldIndexing, TextOptions, STORED, STRING};
use tantivy::tokenizer::{LowerCaser, SimpleTokenizer, StopWordFilter, TextAnalyzer};
use tantivy::Index;

pub const TOKENIZER: &str = "text_with_stopwords";

pub fn build_schema() -> Schema {
	let mut schema_builder = Schema::builder();
	schema_builder.add_text_field("id", STRING | STORED);
	schema_builder.add_text_field("source", STRING | STORED);
	schema_builder.add_text_field("section_path", STORED);
	schema_builder.add_text_field("title", STORED);
	let text_field_indexing = TextFieldIndexing::default().set_tokenizer(TOKENIZER).set_index_option(IndexRecordOption::WithFreqsAndPositions);
	let text_options = TextOptions::default().set_indexing_options(text_field_indexing).set_stored();
	schema_builder.add_text_field("text", text_options);
	schema_builder.add_u64_field("ordinal", NumericOptions::default().set_fast().set_stored().set_indexed());
	schema_builder.build()
}

/// Field handles resolved once per index.
#[derive(Debug, Clone, Copy)]
pub struct Fields {
	pub id: Field,
	pub source: Field,
	pub section_path: Field,
	pub title: Field,
	pub text: Field,
	pub ordinal: Field,
}

impl Fields {
	pub fn from_schema(schema: &Schema) -> tantivy::Result<Self> {
		Ok(Self {
			id: schema.get_field("id")?,
			source: schema.get_field("source")?,
			section_path: schema.get_field("section_path")?,
			title: schema.get_field("title")?,
			text: schema.get_field("text")?,
			ordinal: schema.get_field("ordinal")?,
		})
	}
}

/// Whitespace/punctuation split, lowercased, English function words removed.
/// No stemming.
pub fn register_tokenizer(index: &Index) {
	let stop_words = [
		"a","an","and","are","as","at","be","by","for","from","has","he","in","is","it","its","of","on","that","the","to","was","will","with","or","but","not","this","these","they","them","their","there","then","than","so","if","when","where","why","how","what","which","who","whom","whose","can","could","should","would","may","might","must","shall","do","does","did","have","had","having",
	];
	let tokenizer = TextAnalyzer::builder(SimpleTokenizer::default())
		.filter(LowerCaser)
		.filter(StopWordFilter::remove(stop_words.into_iter().map(|s| s.to_string())))
		.build();
	index.tokenizers().register(TOKENIZER, tokenizer);
}
