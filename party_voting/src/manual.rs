/*!

This is the long-form manual for `party_voting` and `partyvote`.

## Rules

Every voter ranks three cocktails and three dragons. Within a class, the
first choice is worth 5 points, the second 3 points and the third 1 point.
The leaderboard of a class is the sum of the points of all the ballots,
highest first. Candidates with the same number of points are listed by name.
A candidate nobody voted for is still listed, with 0 points.

A voter is identified by a given name and a family name. Names are compared
exactly: `Ada Lovelace` and `ada lovelace` are two different voters. A voter
can only submit one ballot.

## Roster

The cocktails and the dragons are not created by voting. They are loaded from a
JSON file before the party starts:

```json
{
  "cocktails": [
    {"id": 1, "name": "Fire Breath", "presenterName": "Smaug", "ingredients": "dark rum, chili syrup, lime"},
    {"id": 2, "name": "Frost Bite", "presenterName": "Norbert", "ingredients": "vodka, blue curacao"}
  ],
  "dragons": [
    {"id": 1, "name": "Norbert"},
    {"id": 2, "name": "Smaug"}
  ]
}
```

Identifiers must be unique within a class. Loading the same file twice is
harmless: candidates are updated in place by identifier.

```bash
partyvote seed --roster roster.json --database sqlite://party.db
```

## Serving

```bash
partyvote serve --roster roster.json --database sqlite://party.db --port 3000
```

The options can also be given with the `PARTYVOTE_ROSTER`, `PARTYVOTE_DATABASE`,
`PARTYVOTE_BIND` and `PARTYVOTE_PORT` environment variables. Logging is
controlled with `RUST_LOG` or the `--verbose` flag.

| Route | Method | Description |
|---|---|---|
| `/api/cocktails` | GET | the cocktails, by name |
| `/api/dragons` | GET | the dragons, by name |
| `/api/stats` | GET | the current standings of both classes |
| `/api/vote` | POST | submit a ballot |
| `/api/voters/check` | POST | whether a voter already submitted a ballot |
| `/api/stats/live` | GET (WebSocket) | the standings, pushed after every ballot |

A ballot looks like:

```json
{
  "givenName": "Ada",
  "familyName": "Lovelace",
  "selections": [
    {"class": "cocktail", "candidateId": 1, "priority": 1},
    {"class": "cocktail", "candidateId": 2, "priority": 2},
    {"class": "cocktail", "candidateId": 3, "priority": 3},
    {"class": "dragon", "candidateId": 2, "priority": 1},
    {"class": "dragon", "candidateId": 1, "priority": 2},
    {"class": "dragon", "candidateId": 3, "priority": 3}
  ]
}
```

An accepted ballot is answered with `201` and `{"accepted": true, "voterId": ...}`.

A `points` field may be present in a selection. It is ignored: the points are
always computed from the priority.

Errors are returned as `{"error": "...", "message": "..."}`:

| `error` | status | meaning |
|---|---|---|
| `badRequest` | 400 | the body is not JSON, or not in the shape above |
| `missingIdentity` | 400 | a name is empty |
| `incompleteBallot` | 400 | a class does not have exactly one choice per priority |
| `unknownCandidate` | 400 | a selection does not match the roster |
| `duplicateVoter` | 409 | this voter already voted |
| `storage` | 503 | the database failed, the ballot can be sent again |
| `unavailable` | 503 | the server is shutting down |

## Exporting the results

```bash
partyvote standings --database sqlite://party.db --out results.json
```

With `--reference results.json`, the current standings are compared to a
previous export and the differences are printed.

*/
