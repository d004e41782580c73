use crate::model::{QuestionResult, QuestionStatus};

pub fn print_summary(results: &[QuestionResult]) {
    let mut pass = 0;
    let mut partial = 0;
    let mut fail = 0;
    let mut error = 0;
    let mut score_sum = 0.0;

    for r in results {
        score_sum += r.score;
        match r.status {
            QuestionStatus::Pass => pass += 1,
            QuestionStatus::Partial => {
                partial += 1;
                eprintln!("PARTIAL [{}]: score {:.2}", r.question_id, r.score);
            }
            QuestionStatus::Fail => {
                fail += 1;
                eprintln!(
                    "FAIL [{}]: {}",
                    r.question_id,
                    r.execution_details
                        .get("failure_reason")
                        .and_then(|v| v.as_str())
                        .unwrap_or("scored 0.0")
                );
            }
            QuestionStatus::Error => {
                error += 1;
                eprintln!(
                    "ERROR [{}]: {}",
                    r.question_id,
                    r.execution_details
                        .get("error")
                        .and_then(|v| v.as_str())
                        .unwrap_or("unknown error")
                );
            }
        }
    }

    let n = results.len().max(1) as f64;
    eprintln!(
        "Results: pass={} partial={} fail={} error={} mean_score={:.3}",
        pass,
        partial,
        fail,
        error,
        score_sum / n
    );
}
