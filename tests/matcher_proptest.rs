//! Property-based tests for the rule matcher and the compositor language
//!
//! These check the offset arithmetic of the matcher and the placeholder payloads
//! against generated input rather than hand-picked samples.

use compositor_script::script::compositor::grammar::{language, KEYWORDS};
use compositor_script::script::grammar::RuleElement;
use compositor_script::script::matching::{scan_number, Matcher};
use compositor_script::script::testing::compile_source;
use compositor_script::script::token::{TokenValue, LABEL_TOKEN, VALUE_TOKEN};
use compositor_script::script::ScriptSource;
use proptest::prelude::*;

fn keyword_index() -> impl Strategy<Value = usize> {
    0..KEYWORDS.len()
}

proptest! {
    #[test]
    fn keyword_match_ends_after_the_keyword(
        index in keyword_index(),
        indent in "[ \t\n]{0,4}",
        upper in any::<bool>(),
    ) {
        let language = language(false).unwrap();
        let def = &KEYWORDS[index];
        let word = if upper { def.text.to_ascii_uppercase() } else { def.text.to_ascii_lowercase() };
        let text = format!("{}{} rest", indent, word);
        let element = RuleElement::Terminal {
            text: def.text.to_string(),
            emit: true,
            token: Some(def.keyword.id()),
        };

        let mut matcher = Matcher::new(language.grammar(), language.lexemes(), &text);
        let outcome = matcher.match_element_at(&element, 0, 1);

        prop_assert!(outcome.matched);
        prop_assert_eq!(outcome.offset, indent.len() + word.len());
        prop_assert_eq!(outcome.line, 1 + indent.matches('\n').count());
        prop_assert_eq!(outcome.tokens.len(), 1);
        prop_assert_eq!(outcome.tokens[0].id, def.keyword.id());
        prop_assert_eq!(outcome.tokens[0].offset, indent.len());
    }

    #[test]
    fn numbers_carry_their_value(value in -1.0e6f64..1.0e6) {
        let language = language(false).unwrap();
        let text = format!("{} ", value);
        let element = RuleElement::Numeric("n".to_string());

        let mut matcher = Matcher::new(language.grammar(), language.lexemes(), &text);
        let outcome = matcher.match_element_at(&element, 0, 1);

        prop_assert!(outcome.matched);
        prop_assert_eq!(outcome.offset, text.len() - 1);
        prop_assert_eq!(outcome.tokens[0].id, VALUE_TOKEN);
        prop_assert_eq!(&outcome.tokens[0].value, &TokenValue::Number(value));
    }

    #[test]
    fn numbers_never_run_into_words(digits in "[0-9]{1,6}", tail in "[A-Za-z_]{1,4}") {
        prop_assert_eq!(scan_number(&format!("{}{}", digits, tail)), None);
        prop_assert_eq!(scan_number(&format!("{} {}", digits, tail)), Some(digits.len()));
    }

    #[test]
    fn unquoted_labels_stop_at_whitespace_and_braces(
        label in "[A-Za-z0-9_.&]{1,20}",
        stop in prop::sample::select(vec![" ", "\t", "\n", "{", "}"]),
    ) {
        let language = language(false).unwrap();
        let text = format!("{}{}", label, stop);
        let element = RuleElement::Label("l".to_string());

        let mut matcher = Matcher::new(language.grammar(), language.lexemes(), &text);
        let outcome = matcher.match_element_at(&element, 0, 1);

        prop_assert!(outcome.matched);
        prop_assert_eq!(outcome.offset, label.len());
        prop_assert_eq!(outcome.tokens[0].id, LABEL_TOKEN);
        prop_assert_eq!(&outcome.tokens[0].value, &TokenValue::Label(label.clone()));
    }

    #[test]
    fn quoted_labels_keep_inner_spaces(label in "[A-Za-z0-9][A-Za-z0-9 ]{0,15}") {
        let language = language(false).unwrap();
        let text = format!("\"{}\" tail", label);
        let element = RuleElement::Label("l".to_string());

        let mut matcher = Matcher::new(language.grammar(), language.lexemes(), &text);
        let outcome = matcher.match_element_at(&element, 0, 1);

        prop_assert!(outcome.matched);
        prop_assert_eq!(outcome.offset, label.len() + 2);
        prop_assert_eq!(&outcome.tokens[0].value, &TokenValue::Label(label.clone()));
    }

    #[test]
    fn clear_buffers_are_the_union_of_the_listed_types(
        picks in prop::collection::vec(0usize..3, 0..6),
    ) {
        const NAMES: [&str; 3] = ["colour", "depth", "stencil"];
        let listed: Vec<&str> = picks.iter().map(|&i| NAMES[i]).collect();
        let expected = picks.iter().fold(0u32, |bits, &i| bits | (1 << i));
        let text = format!(
            "compositor P {{\n technique {{\n  target_output {{\n   pass clear {{\n    clear {{ buffers {} }}\n   }}\n  }}\n }}\n}}\n",
            listed.join(" ")
        );

        let compiled = compile_source(&ScriptSource::new("buffers.compositor", text));

        prop_assert!(compiled.diagnostics.is_empty(), "{:?}", compiled.diagnostics);
        let pass = &compiled.registry.compositors()[0].techniques[0].output.passes[0];
        prop_assert_eq!(pass.clear_buffers.bits(), expected);
    }
}
