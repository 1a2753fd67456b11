use chrono::{DateTime, Duration, TimeZone, Utc};
use mimir_core::scheduler::{
    calculate_next_due_date, days_until_due, graduate_card, initialize_card, is_card_due,
    is_card_overdue, is_retain_due, new_learning_state, schedule_card, schedule_retain_card,
    sort_by_due_date, start_of_day, DueDate,
};
use mimir_core::{Card, CardMode, IntervalState, Schedule, SchedulingPolicy};

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

#[test]
fn next_due_is_power_of_two_days_at_midnight() {
    let base = at(2024, 3, 10, 14, 30);
    assert_eq!(calculate_next_due_date(0, base), at(2024, 3, 11, 0, 0));
    assert_eq!(calculate_next_due_date(1, base), at(2024, 3, 12, 0, 0));
    assert_eq!(calculate_next_due_date(2, base), at(2024, 3, 14, 0, 0));
    assert_eq!(calculate_next_due_date(3, base), at(2024, 3, 18, 0, 0));
}

#[test]
fn large_exponents_keep_doubling() {
    let base = at(2024, 3, 10, 14, 30);
    let midnight = at(2024, 3, 10, 0, 0);
    for n in 17..=20u32 {
        assert_eq!(
            calculate_next_due_date(n, base),
            midnight + Duration::days(1i64 << n),
            "exponent {n}"
        );
    }
}

#[test]
fn unrepresentable_due_date_saturates() {
    let base = at(2024, 3, 10, 14, 30);
    let far = calculate_next_due_date(u32::MAX, base);
    assert_eq!(far, start_of_day(DateTime::<Utc>::MAX_UTC));
    assert!(far > calculate_next_due_date(20, base));
}

#[test]
fn initialize_seeds_tomorrow() {
    let now = at(2024, 3, 10, 23, 59);
    let s = initialize_card(now);
    assert_eq!(s.review_interval, 0);
    assert_eq!(s.review_count, 0);
    assert_eq!(s.last_reviewed, None);
    assert_eq!(s.due_date, Some(at(2024, 3, 11, 0, 0)));
}

#[test]
fn failure_always_resets_interval() {
    let now = at(2024, 3, 10, 9, 0);
    for prior in [0u32, 1, 5, 16] {
        let state = IntervalState {
            due_date: Some(now),
            review_interval: prior,
            review_count: 7,
            last_reviewed: None,
        };
        let next = schedule_card(&state, false, now);
        assert_eq!(next.review_interval, 0, "prior interval {prior}");
        assert_eq!(next.due_date, Some(at(2024, 3, 11, 0, 0)));
        assert_eq!(next.review_count, 8);
    }
}

#[test]
fn interval_policy_end_to_end() {
    let created = at(2024, 3, 10, 8, 0);
    let card = Card::create("hola", "hello", SchedulingPolicy::Interval, created).unwrap();
    let Schedule::Interval(s0) = &card.schedule else {
        panic!("expected interval schedule");
    };
    assert_eq!(s0.review_interval, 0);
    assert_eq!(s0.due_date, Some(at(2024, 3, 11, 0, 0)));

    let t1 = created + Duration::minutes(1);
    let s1 = schedule_card(s0, true, t1);
    assert_eq!(s1.review_interval, 1);
    assert_eq!(s1.due_date, Some(at(2024, 3, 12, 0, 0)));
    assert_eq!(s1.review_count, 1);
    assert_eq!(s1.last_reviewed, Some(t1));

    let t2 = t1 + Duration::minutes(1);
    let s2 = schedule_card(&s1, false, t2);
    assert_eq!(s2.review_interval, 0);
    assert_eq!(s2.due_date, Some(at(2024, 3, 11, 0, 0)));
    assert_eq!(s2.review_count, 2);
    assert_eq!(s2.last_reviewed, Some(t2));
}

#[test]
fn mode_policy_end_to_end() {
    let now = at(2024, 3, 10, 8, 0);
    let learning = new_learning_state(now);
    assert_eq!(learning.mode, CardMode::Learning);

    let graduated = graduate_card(&learning, now);
    assert_eq!(graduated.mode, CardMode::Retaining);
    assert_eq!(graduated.due_date, now + Duration::days(1));
    assert!(graduated.review_history.is_empty());

    let r1 = schedule_retain_card(&graduated, true, now);
    assert_eq!(r1.review_history.len(), 1);
    assert_eq!(r1.due_date, now + Duration::days(1));

    let r2 = schedule_retain_card(&r1, true, now);
    assert_eq!(r2.review_history.len(), 2);
    assert_eq!(r2.due_date, now + Duration::days(2));

    let r3 = schedule_retain_card(&r2, false, now);
    assert_eq!(r3.review_history.len(), 3);
    assert_eq!(r3.due_date, now);
    assert_eq!(r3.mode, CardMode::Retaining);
    assert!(is_retain_due(&r3, now));
}

#[test]
fn retain_streak_doubles_each_correct_answer() {
    let now = at(2024, 3, 10, 8, 0);
    let mut state = graduate_card(&new_learning_state(now), now);
    for k in 1..=6u32 {
        state = schedule_retain_card(&state, true, now);
        assert_eq!(state.due_date, now + Duration::days(1i64 << (k - 1)), "after {k} correct");
    }
}

#[test]
fn lapse_keeps_earlier_successes() {
    let now = at(2024, 3, 10, 8, 0);
    let mut state = graduate_card(&new_learning_state(now), now);
    state = schedule_retain_card(&state, true, now);
    state = schedule_retain_card(&state, true, now);
    state = schedule_retain_card(&state, false, now);
    state = schedule_retain_card(&state, true, now);
    // three correct answers in total: 2^(3-1)
    assert_eq!(state.due_date, now + Duration::days(4));
}

#[test]
fn graduating_keeps_history() {
    let now = at(2024, 3, 10, 8, 0);
    let mut state = graduate_card(&new_learning_state(now), now);
    state = schedule_retain_card(&state, true, now);
    let again = graduate_card(&state, now);
    assert_eq!(again.review_history, state.review_history);
}

#[test]
fn missing_due_date_is_due_but_not_overdue() {
    let now = at(2024, 3, 10, 8, 0);
    assert!(is_card_due(None, now));
    assert!(!is_card_overdue(None, now));
    assert_eq!(days_until_due(None, now), 0);
}

#[test]
fn due_and_overdue_compare_whole_days() {
    let now = at(2024, 3, 10, 8, 0);
    let later_today = at(2024, 3, 10, 22, 0);
    let yesterday = at(2024, 3, 9, 23, 0);
    let tomorrow = at(2024, 3, 11, 0, 0);

    assert!(is_card_due(Some(later_today), now));
    assert!(!is_card_overdue(Some(later_today), now));
    assert!(is_card_due(Some(yesterday), now));
    assert!(is_card_overdue(Some(yesterday), now));
    assert!(!is_card_due(Some(tomorrow), now));

    assert_eq!(days_until_due(Some(tomorrow), now), 1);
    assert_eq!(days_until_due(Some(yesterday), now), -1);
    assert_eq!(start_of_day(later_today), at(2024, 3, 10, 0, 0));
}

struct Item(&'static str, Option<DateTime<Utc>>);

impl DueDate for Item {
    fn due_date(&self) -> Option<DateTime<Utc>> {
        self.1
    }
}

#[test]
fn sort_puts_undated_last_and_keeps_their_order() {
    let mut items = vec![
        Item("a", None),
        Item("b", Some(at(2024, 3, 12, 0, 0))),
        Item("c", None),
        Item("d", Some(at(2024, 3, 10, 0, 0))),
        Item("e", Some(at(2024, 3, 11, 0, 0))),
    ];
    sort_by_due_date(&mut items);
    let names: Vec<&str> = items.iter().map(|i| i.0).collect();
    assert_eq!(names, ["d", "e", "b", "a", "c"]);
}
