use std::io::{self, Write};

use chrono::{Local, NaiveDate};
use rota_tool::distribution::RotationDistributor;
use rota_tool::persistence::SqliteStore;
use rota_tool::week::{SchoolYear, WeekIdentifier};
use rota_tool::{CurriculumStore, Distribution};

fn print_help() {
    println!(
        "Commands:\n  help                               Show this help\n  seed                               Insert the default six-day grid\n  courses                            List curriculum items\n  classes                            List classes\n  addcourse <text...>                Append a curriculum item\n  addclass <name> <level> <year>     Register a class\n  entry <class_id> <day> <slot>      Put a class on the weekly grid\n  vacation <start> <end> <label...>  Add a vacation range (YYYY-MM-DD)\n  holiday <date> <label...>          Add a public holiday\n  absence <date> <motif...>          Record an absence day\n  weeks                              List the school-year weeks\n  distribute <week_number>           Compute a week's rotation\n  save                               Persist the last computed week\n  load <week_number>                 Show a previously saved week\n  quit|exit                          Exit"
    );
}

fn render_distribution(store: &SqliteStore, distribution: &Distribution) -> String {
    let mut out = String::new();
    if distribution.is_empty() {
        out.push_str("(no classes on the timetable)\n");
        return out;
    }
    for (class_id, slots) in distribution.iter() {
        out.push_str(&format!("class {class_id}:\n"));
        if slots.is_empty() {
            out.push_str("  (no teaching days this week)\n");
            continue;
        }
        for slot in slots {
            let value = slot
                .assignment
                .course_id()
                .and_then(|id| store.value_of(id).ok().flatten());
            match value {
                Some(value) => out.push_str(&format!(
                    "  day {} slot {} -> {} ({value})\n",
                    slot.day_id, slot.time_slot_id, slot.assignment
                )),
                None => out.push_str(&format!(
                    "  day {} slot {} -> {}\n",
                    slot.day_id, slot.time_slot_id, slot.assignment
                )),
            }
        }
    }
    out
}

fn find_week(school_year: &SchoolYear, number: u32) -> Option<WeekIdentifier> {
    school_year.weeks().into_iter().find(|w| w.number == number)
}

fn main() {
    tracing_subscriber::fmt::init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "data/school.db".to_string());
    if let Some(parent) = std::path::Path::new(&path).parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("Cannot create {}: {e}", parent.display());
                return;
            }
        }
    }
    let store = match SqliteStore::open(&path) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Cannot open {path}: {e}");
            return;
        }
    };

    let school_year = SchoolYear::containing(Local::now().date_naive());
    let mut pending: Option<(WeekIdentifier, Distribution)> = None;

    println!("Rotation Tool (CLI) - type 'help' for commands\n");

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let mut parts = input.split_whitespace();
        let cmd = parts.next().unwrap_or("");

        match cmd {
            "help" => print_help(),
            "quit" | "exit" => break,
            "seed" => match store.seed_default_grid() {
                Ok(_) => println!("Default grid ready."),
                Err(e) => println!("Error: {e}"),
            },
            "courses" => match store.all_items() {
                Ok(items) => {
                    for item in items {
                        println!("{:>4}  {}", item.id, item.value);
                    }
                }
                Err(e) => println!("Error: {e}"),
            },
            "classes" => match store.classes() {
                Ok(classes) => {
                    for class in classes {
                        println!(
                            "{:>4}  {} ({}, {})",
                            class.id, class.name, class.level, class.school_year
                        );
                    }
                }
                Err(e) => println!("Error: {e}"),
            },
            "addcourse" => {
                let value = parts.collect::<Vec<_>>().join(" ");
                if value.is_empty() {
                    println!("Usage: addcourse <text...>");
                    continue;
                }
                match store.add_course(&value) {
                    Ok(id) => println!("Course {id} added."),
                    Err(e) => println!("Error: {e}"),
                }
            }
            "addclass" => match (parts.next(), parts.next(), parts.next()) {
                (Some(name), Some(level), Some(year)) => {
                    match store.add_class(name, level, year) {
                        Ok(id) => println!("Class {id} added."),
                        Err(e) => println!("Error: {e}"),
                    }
                }
                _ => println!("Usage: addclass <name> <level> <year>"),
            },
            "entry" => {
                let parsed = (
                    parts.next().and_then(|s| s.parse::<i64>().ok()),
                    parts.next().and_then(|s| s.parse::<i64>().ok()),
                    parts.next().and_then(|s| s.parse::<i64>().ok()),
                );
                match parsed {
                    (Some(class_id), Some(day_id), Some(slot_id)) => {
                        match store.add_schedule_entry(class_id, day_id, slot_id) {
                            Ok(_) => println!("Entry added."),
                            Err(e) => println!("Error: {e}"),
                        }
                    }
                    _ => println!("Usage: entry <class_id> <day> <slot>"),
                }
            }
            "vacation" => {
                let start = parts.next().and_then(parse_date);
                let end = parts.next().and_then(parse_date);
                let label = parts.collect::<Vec<_>>().join(" ");
                match (start, end) {
                    (Some(start), Some(end)) if !label.is_empty() => {
                        match store.add_vacation(start, end, &label) {
                            Ok(_) => println!("Vacation added."),
                            Err(e) => println!("Error: {e}"),
                        }
                    }
                    _ => println!("Usage: vacation <start> <end> <label...>"),
                }
            }
            "holiday" | "absence" => {
                let date = parts.next().and_then(parse_date);
                let label = parts.collect::<Vec<_>>().join(" ");
                match date {
                    Some(date) if !label.is_empty() => {
                        let res = if cmd == "holiday" {
                            store.add_holiday(date, &label)
                        } else {
                            store.add_absence(date, &label)
                        };
                        match res {
                            Ok(_) => println!("{cmd} added."),
                            Err(e) => println!("Error: {e}"),
                        }
                    }
                    _ => println!("Usage: {cmd} <date> <label...>"),
                }
            }
            "weeks" => match store.vacations() {
                Ok(vacations) => {
                    for week in school_year.weeks() {
                        let suffix = vacations
                            .iter()
                            .find(|v| v.overlaps(week.start, week.end))
                            .map(|v| format!(" ({})", v.label))
                            .unwrap_or_default();
                        println!("{}", week.label(&suffix));
                    }
                }
                Err(e) => println!("Error: {e}"),
            },
            "distribute" => {
                let number = parts.next().and_then(|s| s.parse::<u32>().ok());
                let Some(number) = number else {
                    println!("Usage: distribute <week_number>");
                    continue;
                };
                let Some(week) = find_week(&school_year, number) else {
                    println!("Week {number} is not in the current school year.");
                    continue;
                };
                let distributor = RotationDistributor::new(&store, &store, &store, &store);
                match distributor.distribute(&week) {
                    Ok(distribution) => {
                        let (ok, errors) = distributor.validate_distribution(&distribution);
                        print!("{}", render_distribution(&store, &distribution));
                        if !ok {
                            for error in errors {
                                println!("warning: {error}");
                            }
                        }
                        pending = Some((week, distribution));
                        println!("Computed (not saved) - 'save' to persist.");
                    }
                    Err(e) => println!("Error: {e}"),
                }
            }
            "save" => match &pending {
                Some((week, distribution)) => {
                    match store.save_distribution(week, distribution) {
                        Ok(_) => println!("Week {} saved.", week.number),
                        Err(e) => println!("Error: {e}"),
                    }
                }
                None => println!("Nothing to save - run 'distribute' first."),
            },
            "load" => {
                let number = parts.next().and_then(|s| s.parse::<u32>().ok());
                let Some(number) = number else {
                    println!("Usage: load <week_number>");
                    continue;
                };
                let Some(week) = find_week(&school_year, number) else {
                    println!("Week {number} is not in the current school year.");
                    continue;
                };
                match store.load_distribution(week.number, week.primary_year()) {
                    Ok(distribution) if distribution.is_empty() => {
                        println!("No saved distribution for week {number}.");
                    }
                    Ok(distribution) => print!("{}", render_distribution(&store, &distribution)),
                    Err(e) => println!("Error: {e}"),
                }
            }
            other => println!("Unknown command '{other}' - type 'help'"),
        }
    }
}

fn parse_date(input: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d").ok()
}
