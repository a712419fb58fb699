use moravoice::constants::SAMPLES_PER_FRAME;
use moravoice::{
    DurationModel, ModelBackends, ModelStage, PhonemeSet, PitchInput, PitchModel, Recording,
    ReplayModels, ResamplePhase, SynthesisError, SynthesisPipeline, WaveDecoder,
};
use std::sync::{Arc, Mutex};

const KONNICHIWA: &str = include_str!("fixtures/konnichiwa.lab");
const KITTE: &str = include_str!("fixtures/kitte.lab");

fn lines(text: &str) -> Vec<&str> {
    text.lines().collect()
}

#[derive(Default)]
struct Seen {
    phoneme_ids: Vec<i64>,
    vowel_ids: Vec<i64>,
    consonant_ids: Vec<i64>,
    flags: Vec<Vec<bool>>,
    vocab_size: usize,
    one_hot_len: usize,
    speaker: i64,
}

#[derive(Clone)]
struct MockModels {
    seen: Arc<Mutex<Seen>>,
    fail_pitch: bool,
}

impl DurationModel for MockModels {
    fn predict(&mut self, phoneme_ids: &[i64], speaker: i64) -> anyhow::Result<Vec<f32>> {
        let mut seen = self.seen.lock().unwrap();
        seen.phoneme_ids = phoneme_ids.to_vec();
        seen.speaker = speaker;
        Ok(vec![0.05; phoneme_ids.len()])
    }
}

impl PitchModel for MockModels {
    fn predict(&mut self, input: PitchInput<'_>, _speaker: i64) -> anyhow::Result<Vec<f32>> {
        if self.fail_pitch {
            anyhow::bail!("pitch session crashed");
        }
        let mut seen = self.seen.lock().unwrap();
        seen.vowel_ids = input.vowel_ids.to_vec();
        seen.consonant_ids = input.consonant_ids.to_vec();
        seen.flags = vec![
            input.start_accent.to_vec(),
            input.end_accent.to_vec(),
            input.start_accent_phrase.to_vec(),
            input.end_accent_phrase.to_vec(),
        ];
        Ok(vec![5.5; input.len()])
    }
}

impl WaveDecoder for MockModels {
    fn decode(
        &mut self,
        pitch: &[f32],
        one_hot: &[f32],
        vocab_size: usize,
        _speaker: i64,
    ) -> anyhow::Result<Vec<f32>> {
        let mut seen = self.seen.lock().unwrap();
        seen.vocab_size = vocab_size;
        seen.one_hot_len = one_hot.len();
        Ok(vec![0.25; pitch.len() * SAMPLES_PER_FRAME])
    }
}

fn mock_pipeline(set: PhonemeSet, fail_pitch: bool) -> (SynthesisPipeline, Arc<Mutex<Seen>>) {
    let seen = Arc::new(Mutex::new(Seen::default()));
    let mock = MockModels {
        seen: seen.clone(),
        fail_pitch,
    };
    let models = ModelBackends {
        duration: Box::new(mock.clone()),
        pitch: Box::new(mock.clone()),
        decoder: Box::new(mock),
    };
    (SynthesisPipeline::new(models, set), seen)
}

#[test]
fn konnichiwa_end_to_end() {
    let (mut pipeline, seen) = mock_pipeline(PhonemeSet::OpenJtalk, false);
    let trace = pipeline
        .forward_trace(&lines(KONNICHIWA), 3, ResamplePhase::new(0.5))
        .unwrap();

    assert_eq!(
        trace.phonemes,
        ["pau", "k", "o", "N", "n", "i", "ch", "i", "w", "a", "pau"]
    );
    assert_eq!(trace.phoneme_ids, [0, 23, 30, 4, 28, 21, 10, 21, 42, 7, 0]);
    assert_eq!(trace.durations.first(), Some(&0.1));
    assert_eq!(trace.durations.last(), Some(&0.1));

    assert_eq!(trace.moras.vowel_indices, [0, 2, 3, 5, 7, 9, 10]);
    assert_eq!(trace.pitch, [0.0, 5.5, 5.5, 5.5, 5.5, 5.5, 0.0]);
    assert_eq!(trace.frame_count, 130);
    assert_eq!(trace.resampled_pitch.len(), 60);
    assert_eq!(trace.resampled_one_hot.shape(), &[60, 45]);
    for row in trace.resampled_one_hot.rows() {
        assert_eq!(row.sum(), 1.0);
    }
    assert_eq!(trace.audio.len(), 60 * SAMPLES_PER_FRAME);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.speaker, 3);
    assert_eq!(seen.phoneme_ids, trace.phoneme_ids);
    assert_eq!(seen.vowel_ids, [0, 30, 4, 21, 21, 7, 0]);
    assert_eq!(seen.consonant_ids, [-1, 23, -1, 28, 10, 42, -1]);
    let f = false;
    let t = true;
    assert_eq!(seen.flags[0], [f, f, t, f, f, f, f]);
    assert_eq!(seen.flags[1], [f, f, f, f, f, t, f]);
    assert_eq!(seen.flags[2], [f, t, f, f, f, f, f]);
    assert_eq!(seen.flags[3], [f, f, f, f, f, t, f]);
    assert_eq!(seen.vocab_size, 45);
    assert_eq!(seen.one_hot_len, 60 * 45);
}

#[test]
fn phoneme_and_mora_frames_agree() {
    let (mut pipeline, _) = mock_pipeline(PhonemeSet::OpenJtalk, false);
    let trace = pipeline
        .forward_trace(&lines(KONNICHIWA), 0, ResamplePhase::new(0.0))
        .unwrap();
    let rate = moravoice::constants::CONTROL_RATE;
    let phoneme_frames: usize = trace
        .durations
        .iter()
        .map(|d| (d * rate).round() as usize)
        .sum();
    let mora_frames: usize = trace
        .mora_durations
        .iter()
        .map(|d| (d * rate).round() as usize)
        .sum();
    assert_eq!(phoneme_frames, mora_frames);
    assert_eq!(phoneme_frames, trace.frame_count);
}

#[test]
fn geminate_mora_has_zero_pitch() {
    let (mut pipeline, _) = mock_pipeline(PhonemeSet::OpenJtalk, false);
    let trace = pipeline
        .forward_trace(&lines(KITTE), 0, ResamplePhase::new(0.2))
        .unwrap();
    assert_eq!(trace.phonemes, ["pau", "k", "i", "cl", "t", "e", "pau"]);
    assert_eq!(trace.moras.vowel_indices, [0, 2, 3, 5, 6]);
    assert_eq!(trace.pitch, [0.0, 5.5, 0.0, 5.5, 0.0]);
}

#[test]
fn fixed_phase_is_deterministic() {
    let (mut pipeline, _) = mock_pipeline(PhonemeSet::OpenJtalk, false);
    let phase = ResamplePhase::new(0.73);
    let a = pipeline.forward_trace(&lines(KONNICHIWA), 0, phase).unwrap();
    let b = pipeline.forward_trace(&lines(KONNICHIWA), 0, phase).unwrap();
    assert_eq!(a.resampled_pitch, b.resampled_pitch);
    assert_eq!(a.resampled_one_hot, b.resampled_one_hot);
}

#[test]
fn jvs_vocabulary_changes_ids_and_width() {
    let (mut pipeline, seen) = mock_pipeline(PhonemeSet::Jvs, false);
    let trace = pipeline
        .forward_trace(&lines(KONNICHIWA), 0, ResamplePhase::new(0.5))
        .unwrap();
    assert_eq!(trace.phoneme_ids, [0, 20, 26, 2, 24, 18, 7, 18, 37, 4, 0]);
    assert_eq!(trace.resampled_one_hot.ncols(), 40);
    assert_eq!(seen.lock().unwrap().vocab_size, 40);
}

#[test]
fn model_failure_names_the_stage() {
    let (mut pipeline, _) = mock_pipeline(PhonemeSet::OpenJtalk, true);
    let err = pipeline.forward(&lines(KONNICHIWA), 0).unwrap_err();
    match err {
        SynthesisError::ModelCallFailed { stage, message } => {
            assert_eq!(stage, ModelStage::Pitch);
            assert!(message.contains("pitch session crashed"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn malformed_label_aborts_before_models() {
    let (mut pipeline, seen) = mock_pipeline(PhonemeSet::OpenJtalk, false);
    let mut labels = lines(KONNICHIWA);
    labels[4] = "o^N-n+i=ch/A:-2+3+3";
    let err = pipeline.forward(&labels, 0).unwrap_err();
    assert!(matches!(err, SynthesisError::MalformedLabel { .. }));
    assert!(seen.lock().unwrap().phoneme_ids.is_empty());
}

#[test]
fn replay_recording_drives_pipeline() {
    let recording = Recording {
        durations: vec![0.3, 0.04, 0.06, 0.05, 0.04, 0.06, 0.05, 0.05, 0.04, 0.06, 0.3],
        pitch: vec![0.0, 5.2, 5.4, 5.5, 5.5, 5.4, 0.0],
        audio: vec![0.1; 512],
        phoneme_ids: Some(vec![0, 23, 30, 4, 28, 21, 10, 21, 42, 7, 0]),
        vowel_ids: Some(vec![0, 30, 4, 21, 21, 7, 0]),
        consonant_ids: None,
    };
    let mut pipeline = SynthesisPipeline::new(
        ReplayModels::new(recording.clone()).into_backends(),
        PhonemeSet::OpenJtalk,
    );
    let trace = pipeline
        .forward_trace(&lines(KONNICHIWA), 0, ResamplePhase::new(0.1))
        .unwrap();
    assert_eq!(trace.durations[0], 0.1);
    assert_eq!(trace.pitch[1], 5.2);
    assert_eq!(trace.audio, recording.audio);

    let mut bad = recording;
    bad.vowel_ids = Some(vec![0, 30, 4, 21, 99, 7, 0]);
    let mut pipeline =
        SynthesisPipeline::new(ReplayModels::new(bad).into_backends(), PhonemeSet::OpenJtalk);
    match pipeline.forward(&lines(KONNICHIWA), 0).unwrap_err() {
        SynthesisError::ModelCallFailed { stage, message } => {
            assert_eq!(stage, ModelStage::Pitch);
            assert!(message.contains("index 4"), "{message}");
        }
        other => panic!("unexpected error: {other}"),
    }
}
