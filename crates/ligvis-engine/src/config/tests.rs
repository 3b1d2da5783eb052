#[cfg(test)]
mod tests {
    use super::super::*;

    fn complete() -> VisualizationConfig {
        VisualizationConfig {
            receptor: Some("rec.pdbqt".into()),
            ligand: Some("lig.pdbqt".into()),
            cnn_model: Some("model.json".into()),
            cnn_weights: Some("model.safetensors".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = VisualizationConfig::default();
        assert_eq!(config.box_size, 23.5);
        assert_eq!(config.gpu, -1);
        assert_eq!(config.method, VisMethod::Masking);
        assert_eq!(config.out_dir, PathBuf::from("."));
    }

    #[test]
    fn test_removal_is_masking() {
        assert_eq!("removal".parse::<VisMethod>().unwrap(), VisMethod::Masking);
        assert_eq!("masking".parse::<VisMethod>().unwrap(), VisMethod::Masking);
        assert_eq!("LRP".parse::<VisMethod>().unwrap(), VisMethod::Lrp);
        assert_eq!("all".parse::<VisMethod>().unwrap(), VisMethod::All);
    }

    #[test]
    fn test_unknown_method_lists_choices() {
        let err = "saliency".parse::<VisMethod>().unwrap_err();
        assert!(err.is_configuration());
        let msg = err.to_string();
        assert!(msg.contains("saliency"));
        assert!(msg.contains("removal, masking, lrp, gradient, all"), "{}", msg);
    }

    #[test]
    fn test_missing_inputs_are_reported_in_order() {
        let mut config = complete();
        config.receptor = None;
        config.cnn_weights = None;
        assert_eq!(config.validate().unwrap_err().to_string(), "Missing receptor.");

        config.receptor = Some("rec.pdbqt".into());
        assert_eq!(config.validate().unwrap_err().to_string(), "Missing cnn_weights.");

        config.cnn_weights = Some("w.safetensors".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_frags_and_atoms_are_exclusive() {
        let mut config = complete();
        config.frags_only = true;
        assert_eq!(config.unit_mode().unwrap(), UnitMode::FragsOnly);
        config.atoms_only = true;
        let err = config.validate().unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("frags_only"));
    }

    #[test]
    fn test_box_size_must_be_positive() {
        let mut config = complete();
        config.box_size = 0.0;
        assert!(config.validate().is_err());
        config.box_size = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: VisualizationConfig = serde_json::from_str(
            r#"{ "receptor": "r.pdbqt", "ligand": "l.pdbqt", "cnn_model": "m.json",
                 "cnn_weights": "w.safetensors", "method": "lrp", "additivity": "ligand" }"#,
        )
        .unwrap();
        assert_eq!(config.method, VisMethod::Lrp);
        assert_eq!(config.additivity, Some(Side::Ligand));
        assert_eq!(config.box_size, 23.5);
        assert!(config.validate().is_ok());
    }
}
