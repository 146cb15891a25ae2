use anyhow::anyhow;
use clap::Parser;
use const_format::concatcp;
use rand::{distributions::Alphanumeric, seq::SliceRandom, Rng};
use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::process::{self, Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const LOCAL_PORT: u32 = 8374;
const LOCAL_URL: &str = concatcp!("http://127.0.0.1:", LOCAL_PORT);

#[derive(Parser)]
struct Args {
    /// Silence local server logging.
    #[arg(short, long)]
    quiet: bool,

    /// Send local server logging to this file; takes precedence over --quiet.
    #[arg(long)]
    logfile: Option<String>,

    /// Connect to a remote server at this URL instead of running a local one.
    #[arg(long)]
    remote: Option<String>,

    /// How many threads to use. Defaults to the number of logical CPUs.
    #[arg(long, default_value_t = num_cpus::get())]
    threads: usize,

    /// How many voters each thread registers.
    #[arg(long, default_value_t = 20)]
    voters_per_thread: usize,

    /// How many simultaneous votes each voter attempts. Exactly one must win.
    #[arg(long, default_value_t = 4)]
    attempts: usize,
}

#[derive(Deserialize)]
struct User {
    id: u64,
}

#[derive(Deserialize)]
struct Session {
    token: String,
    user: User,
}

#[derive(Deserialize)]
struct Candidate {
    id: u64,
}

#[derive(Deserialize)]
struct Vote {
    user_id: u64,
    candidate_id: u64,
}

#[derive(Deserialize)]
struct CandidateTotal {
    candidate_id: u64,
    votes: u64,
}

/// Construct a URL under the API root.
macro_rules! url {
    ($base:expr, $path:expr) => {
        format!("{}/api/{}", $base.trim_end_matches('/'), $path)
    };
}

/// Ensure the optimised server build is up-to-date.
fn build_server() -> anyhow::Result<()> {
    Command::new("cargo")
        .args(["build", "--release", "--bin", "voting-backend"])
        .status()?
        .success()
        .then_some(())
        .ok_or_else(|| anyhow!("server build exited nonzero"))
}

/// Terminate the given child process. This is a SIGTERM on unix and a hard-kill on other
/// platforms.
fn terminate_child(child: &mut Child) -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        let pid = nix::unistd::Pid::from_raw(child.id() as i32);
        nix::sys::signal::kill(pid, nix::sys::signal::Signal::SIGTERM)?;
    }
    #[cfg(not(unix))]
    {
        child.kill()?;
    }
    Ok(())
}

/// Start a local server and wait until it answers.
fn launch_server(logfile: Stdio) -> anyhow::Result<Child> {
    let mut proc = Command::new("./target/release/voting-backend")
        .env("ROCKET_PORT", concatcp!(LOCAL_PORT))
        .stdout(logfile)
        .spawn()?;

    // An unauthenticated candidate listing is the cheapest request that
    // proves the API is mounted.
    let client = Client::new();
    loop {
        if let Ok(resp) = client.get(url!(LOCAL_URL, "candidates")).send() {
            if resp.status() == StatusCode::UNAUTHORIZED {
                break;
            }
            terminate_child(&mut proc)?;
            proc.wait()?;
            return Err(anyhow!("Bad response: {}", resp.status()));
        }

        // Check the server didn't exit.
        if let Some(retcode) = proc.try_wait()? {
            return Err(anyhow!("Server exited prematurely with code {}", retcode));
        }
        thread::sleep(Duration::from_millis(50));
    }

    Ok(proc)
}

/// Register a voter and log them in, returning their session.
fn voter_auth(client: &Client, url: &str, username: &str) -> anyhow::Result<Session> {
    let creds = json!({
        "username": username,
        "email": format!("{username}@example.com"),
        "password": "benchmark",
    });
    client
        .post(url!(url, "register"))
        .json(&creds)
        .send()
        .and_then(Response::error_for_status)?;

    let session = client
        .post(url!(url, "login"))
        .json(&creds)
        .send()
        .and_then(Response::error_for_status)?
        .json()?;
    Ok(session)
}

/// Fire `attempts` votes for the same voter at once and return how many were
/// accepted.
fn cast_votes(
    client: &Client,
    url: &str,
    token: &str,
    candidates: &[u64],
    attempts: usize,
) -> anyhow::Result<usize> {
    thread::scope(|s| {
        let threads: Vec<_> = (0..attempts)
            .map(|_| {
                s.spawn(|| {
                    let candidate = candidates.choose(&mut rand::thread_rng());
                    let resp = client
                        .post(url!(url, "vote"))
                        .header("Authorization", format!("Token {token}"))
                        .json(&json!({ "candidate": candidate }))
                        .send()?;
                    match resp.status() {
                        StatusCode::CREATED => Ok(true),
                        StatusCode::BAD_REQUEST => Ok(false),
                        other => Err(anyhow!("unexpected vote status {other}")),
                    }
                })
            })
            .collect();

        let mut accepted = 0;
        for t in threads {
            if t.join().map_err(|_| anyhow!("vote thread panicked"))?? {
                accepted += 1;
            }
        }
        Ok(accepted)
    })
}

/// Run the benchmark and return the IDs of every voter that took part.
fn benchmark(url: &str, args: &Args, candidates: &[u64]) -> anyhow::Result<HashSet<u64>> {
    // Usernames must not collide with an earlier run against the same server.
    let run: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();

    let start = Instant::now();
    let voters = thread::scope(|s| {
        let threads: Vec<_> = (0..args.threads)
            .map(|thread_no| {
                let run = &run;
                s.spawn(move || {
                    let client = Client::new();
                    let mut auth_duration = Duration::ZERO;
                    let mut vote_duration = Duration::ZERO;
                    let mut voters = Vec::with_capacity(args.voters_per_thread);

                    for n in 0..args.voters_per_thread {
                        let username = format!("bench-{run}-{thread_no}-{n}");
                        let pre_auth = Instant::now();
                        let session = voter_auth(&client, url, &username)?;
                        auth_duration += pre_auth.elapsed();

                        let pre_vote = Instant::now();
                        let accepted =
                            cast_votes(&client, url, &session.token, candidates, args.attempts)?;
                        vote_duration += pre_vote.elapsed();

                        if accepted != 1 {
                            return Err(anyhow!("{username} had {accepted} votes accepted"));
                        }
                        voters.push(session.user.id);
                    }

                    Ok::<_, anyhow::Error>((voters, auth_duration, vote_duration))
                })
            })
            .collect();

        let mut voters = HashSet::new();
        let mut auth_duration = Duration::ZERO;
        let mut vote_duration = Duration::ZERO;
        for t in threads {
            let (ids, auth_dur, vote_dur) = t.join().map_err(|_| anyhow!("thread panicked"))??;
            voters.extend(ids);
            auth_duration += auth_dur;
            vote_duration += vote_dur;
        }
        Ok::<_, anyhow::Error>((voters, auth_duration, vote_duration))
    });
    let (voters, auth_duration, vote_duration) = voters?;
    let total_duration = start.elapsed();

    let count = voters.len().max(1) as u32;
    println!("auth: {:?}", auth_duration / count);
    println!("vote: {:?}", vote_duration / count);
    println!(
        "actual duration: {} voters in {:?} ({:.2}/s)",
        voters.len(),
        total_duration,
        voters.len() as f64 / total_duration.as_secs_f64()
    );

    Ok(voters)
}

/// Return `Ok(())` if the published results hold exactly one vote per voter
/// and the totals agree with them.
fn verify(client: &Client, url: &str, token: &str, voters: &HashSet<u64>) -> anyhow::Result<()> {
    let votes: Vec<Vote> = client
        .get(url!(url, "results"))
        .header("Authorization", format!("Token {token}"))
        .send()
        .and_then(Response::error_for_status)?
        .json()?;

    let mut per_voter: HashMap<u64, usize> = HashMap::new();
    for vote in votes.iter().filter(|v| voters.contains(&v.user_id)) {
        *per_voter.entry(vote.user_id).or_default() += 1;
    }
    if per_voter.len() != voters.len() || per_voter.values().any(|n| *n != 1) {
        return Err(anyhow!("results do not hold exactly one vote per voter"));
    }

    let totals: Vec<CandidateTotal> = client
        .get(url!(url, "results/totals"))
        .header("Authorization", format!("Token {token}"))
        .send()
        .and_then(Response::error_for_status)?
        .json()?;
    for total in &totals {
        let counted = votes
            .iter()
            .filter(|v| v.candidate_id == total.candidate_id)
            .count() as u64;
        if counted != total.votes {
            return Err(anyhow!(
                "candidate {} totals {} but has {} votes",
                total.candidate_id,
                total.votes,
                counted
            ));
        }
    }

    println!("verified {} votes", votes.len());
    Ok(())
}

fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    let url = args.remote.as_deref().unwrap_or(LOCAL_URL);

    // If we're not connecting remotely, bring up a local server.
    let mut proc: Option<Child> = None;
    if args.remote.is_none() {
        build_server()?;
        let logfile = match &args.logfile {
            Some(path) => Stdio::from(File::create(path)?),
            None => {
                if args.quiet {
                    Stdio::null()
                } else {
                    Stdio::inherit()
                }
            }
        };
        proc = Some(launch_server(logfile)?);
    }

    // Use a closure to ensure the cleanup below runs.
    let result = (|| {
        let client = Client::new();
        let observer: String = format!("bench-observer-{}", rand::random::<u32>());
        let session = voter_auth(&client, url, &observer)?;

        let candidates: Vec<Candidate> = client
            .get(url!(url, "candidates"))
            .header("Authorization", format!("Token {}", session.token))
            .send()
            .and_then(Response::error_for_status)?
            .json()?;
        let candidates: Vec<u64> = candidates.into_iter().map(|c| c.id).collect();
        if candidates.is_empty() {
            return Err(anyhow!("server has no candidates"));
        }

        let voters = benchmark(url, &args, &candidates)?;
        verify(&client, url, &session.token, &voters)
    })();

    // Kill the server.
    if let Some(p) = proc.as_mut() {
        terminate_child(p)?;
        p.wait()?;
    }

    result
}

fn main() {
    if let Err(e) = run() {
        eprintln!("FATAL: {}", e);
        process::exit(1);
    }
}
