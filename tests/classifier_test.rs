use toxiclass::{BuiltinModel, Classifier, ClassifierError, ModelManager, ToxicityLabel, NONE_LABEL};
use std::sync::Arc;
use std::thread;

async fn setup_test_classifier() -> Result<Classifier, Box<dyn std::error::Error>> {
    let manager = ModelManager::new_default()?
        .with_token(std::env::var("HF_TOKEN").ok());
    let model = BuiltinModel::ToxicBert;
    manager.ensure_model_downloaded(&model.get_model_info()).await?;

    let classifier = Classifier::builder()
        .with_builtin_model(&manager, model)?
        .build()?;
    Ok(classifier)
}

#[test]
fn test_validation_errors() {
    let result = Classifier::builder().with_custom_model("", "tokenizer.json", None);
    assert!(matches!(result, Err(ClassifierError::BuildError(_))));

    let result = Classifier::builder().with_custom_model("model.onnx", "", None);
    assert!(matches!(result, Err(ClassifierError::BuildError(_))));

    let result = Classifier::builder().with_threshold(2.0);
    assert!(matches!(result, Err(ClassifierError::ValidationError(_))));
}

#[tokio::test]
#[ignore = "downloads the toxic-bert model"]
async fn test_benign_comment_is_none() -> Result<(), Box<dyn std::error::Error>> {
    let classifier = setup_test_classifier().await?;
    let result = classifier.classify("You are wonderful", 0.5)?;
    assert_eq!(result.labels, vec![NONE_LABEL]);
    assert!(result.is_clean());
    for (_, p) in result.probabilities.iter() {
        assert!(p < 0.5);
    }
    Ok(())
}

#[tokio::test]
#[ignore = "downloads the toxic-bert model"]
async fn test_threat_is_detected() -> Result<(), Box<dyn std::error::Error>> {
    let classifier = setup_test_classifier().await?;
    let result = classifier.predict("I will kill you")?;
    assert!(result.labels.iter().any(|l| l == "threat"));
    assert!(!result.labels.iter().any(|l| l == NONE_LABEL));
    Ok(())
}

#[tokio::test]
#[ignore = "downloads the toxic-bert model"]
async fn test_probabilities_cover_every_label() -> Result<(), Box<dyn std::error::Error>> {
    let classifier = setup_test_classifier().await?;
    for text in ["hello there", "you absolute idiot", "x"] {
        let result = classifier.classify(text, 0.5)?;
        let value = serde_json::to_value(&result.probabilities)?;
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys.len(), 6);
        for label in ToxicityLabel::ALL {
            let p = result.probabilities.get(label);
            assert!((0.0..=1.0).contains(&p), "{} out of range: {}", label, p);
        }
        let selected: Vec<String> = result
            .probabilities
            .iter()
            .filter(|&(_, p)| p >= 0.5)
            .map(|(l, _)| l.to_string())
            .collect();
        if selected.is_empty() {
            assert_eq!(result.labels, vec![NONE_LABEL]);
        } else {
            assert_eq!(result.labels, selected);
        }
    }
    Ok(())
}

#[tokio::test]
#[ignore = "downloads the toxic-bert model"]
async fn test_token_length_handling() -> Result<(), Box<dyn std::error::Error>> {
    let classifier = setup_test_classifier().await?;
    let very_long_text = "this sentence keeps going so the tokenizer has plenty to chew on ".repeat(200);

    let token_count = classifier.count_tokens(&very_long_text)?;
    assert_eq!(token_count, classifier.info().max_sequence_length, "Expected truncation at the model limit");

    assert!(classifier.classify(&very_long_text, 0.5).is_ok(), "Classification should succeed with truncated input");
    Ok(())
}

#[tokio::test]
#[ignore = "downloads the toxic-bert model"]
async fn test_empty_input_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let classifier = setup_test_classifier().await?;
    assert!(matches!(classifier.classify("", 0.5), Err(ClassifierError::ValidationError(_))));
    assert!(matches!(classifier.classify("fine", 1.5), Err(ClassifierError::ValidationError(_))));
    Ok(())
}

#[tokio::test]
#[ignore = "downloads the toxic-bert model"]
async fn test_thread_safety() -> Result<(), Box<dyn std::error::Error>> {
    let classifier = Arc::new(setup_test_classifier().await?);
    let mut handles = vec![];

    for _ in 0..3 {
        let classifier = Arc::clone(&classifier);
        handles.push(thread::spawn(move || {
            assert!(classifier.predict("test text").is_ok());
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }
    Ok(())
}
